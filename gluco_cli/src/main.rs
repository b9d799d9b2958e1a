use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use gluco_core::glucose::DayPart;
use gluco_core::insulin::insulin_summary;
use gluco_core::lifestyle::{activity_summary, carb_summary, medication_adherence, mood_summary};
use gluco_core::store::{import_glucose_csv, log_path};
use gluco_core::*;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gluco")]
#[command(about = "Diabetes self-management insights from your logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/gluco/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference instant (RFC 3339) instead of the current time
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full report for a period
    Report {
        /// Look-back period in days (7, 14, 30, 90)
        #[arg(long, default_value = "30", value_parser = parse_period)]
        period: Period,
    },

    /// Show the behavioral insight for a period
    Insights {
        #[arg(long, default_value = "30", value_parser = parse_period)]
        period: Period,

        /// Show every matching pattern, not just the first
        #[arg(long)]
        all: bool,
    },

    /// Show calculator outputs for a period
    Stats {
        #[arg(long, default_value = "30", value_parser = parse_period)]
        period: Period,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show streak, points, level and achievements
    Streak,

    /// Parse a free-text meal description
    Meal {
        /// Meal description, e.g. "2 cups of rice and chicken"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Append the parsed items to the log as carb entries
        #[arg(long)]
        commit: bool,

        /// Extra food records from a product catalog (JSON array)
        #[arg(long)]
        products: Option<PathBuf>,
    },

    /// Import glucose readings from a meter CSV export (taken_at,value)
    ImportCsv {
        file: PathBuf,
    },

    /// Log a manual entry
    Log {
        #[command(subcommand)]
        entry: LogCommand,
    },

    /// Look up a product by barcode and show its food record
    Lookup {
        barcode: String,

        /// Product catalog (JSON array of product records)
        #[arg(long)]
        products: PathBuf,
    },
}

#[derive(Subcommand)]
enum LogCommand {
    /// Log a glucose reading in mg/dL
    Glucose { value: f64 },

    /// Log an insulin dose
    Insulin {
        units: f64,

        /// rapid, short, intermediate, long or mixed
        #[arg(long, default_value = "rapid")]
        kind: String,
    },
}

fn parse_now(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

fn parse_period(s: &str) -> std::result::Result<Period, String> {
    s.trim()
        .parse::<i64>()
        .ok()
        .and_then(Period::from_days)
        .ok_or_else(|| format!("unsupported period '{}' (use 7, 14, 30 or 90)", s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    gluco_core::logging::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let ctx = config.context(cli.now.unwrap_or_else(Utc::now))?;

    match cli.command {
        Commands::Report { period } => cmd_report(&data_dir, period, &ctx, &config),
        Commands::Insights { period, all } => cmd_insights(&data_dir, period, all, &ctx),
        Commands::Stats { period, json } => cmd_stats(&data_dir, period, json, &ctx, &config),
        Commands::Streak => cmd_streak(&data_dir, &ctx),
        Commands::Meal {
            text,
            commit,
            products,
        } => cmd_meal(&data_dir, &text.join(" "), commit, products.as_deref(), &ctx),
        Commands::ImportCsv { file } => cmd_import_csv(&data_dir, &file),
        Commands::Log { entry } => cmd_log(&data_dir, entry, &ctx),
        Commands::Lookup { barcode, products } => cmd_lookup(&barcode, &products),
    }
}

fn cmd_report(
    data_dir: &Path,
    period: Period,
    ctx: &AnalysisContext,
    config: &Config,
) -> Result<()> {
    let repo = load_repository(&log_path(data_dir))?;
    let report = compose_report(&repo, period, ctx, config.targets.unit);
    print!("{}", report);
    Ok(())
}

fn cmd_insights(data_dir: &Path, period: Period, all: bool, ctx: &AnalysisContext) -> Result<()> {
    let repo = load_repository(&log_path(data_dir))?;
    let window = repo.within(period, ctx.now);
    let stats = GlucoseStats::compute(&window.glucose, &repo.glucose, ctx);

    let insights = if all {
        detect_all(&window.glucose, &stats, ctx)
    } else {
        vec![detect(&window.glucose, &stats, ctx)]
    };

    for insight in insights {
        println!(
            "[{}] {}",
            insight.severity.label().to_uppercase(),
            insight.message
        );
    }
    Ok(())
}

fn cmd_stats(
    data_dir: &Path,
    period: Period,
    as_json: bool,
    ctx: &AnalysisContext,
    config: &Config,
) -> Result<()> {
    let repo = load_repository(&log_path(data_dir))?;
    let window = repo.within(period, ctx.now);
    let stats = GlucoseStats::compute(&window.glucose, &repo.glucose, ctx);
    let streak = streak_summary(&repo, ctx);
    let points = points_and_level(&repo, &streak);

    if as_json {
        let output = json!({
            "period": period,
            "now": ctx.now,
            "glucose": stats,
            "carbs": carb_summary(&window.carbs, ctx),
            "insulin": insulin_summary(&window.insulin, ctx),
            "medications": medication_adherence(&window.medications),
            "activity": activity_summary(&window.activity),
            "mood": mood_summary(&window.mood),
            "streak": streak,
            "points": points,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let unit = config.targets.unit;
    println!("{} ({} readings)", period, stats.reading_count);
    println!("  Average:        {}", show(&stats.average, |v| unit.format(f64::from(*v))));
    println!("  Estimated A1C:  {}", show(&stats.estimated_a1c, |v| format!("{:.1}%", v)));
    println!(
        "  Time in range:  {}",
        show(&stats.time_in_range, |t| format!("{}%", t.in_range))
    );
    println!(
        "  CV:             {}",
        show(&stats.variability, |v| format!("{}%", v.cv))
    );
    for part in DayPart::ALL {
        println!(
            "  {:<15} {}",
            format!("{}:", part.label()),
            show(stats.time_of_day.get(part), |b| unit.format(b.mean))
        );
    }
    println!(
        "  Week delta:     {}",
        show(&stats.weekly, |w| format!("{:+.1} mg/dL", w.delta))
    );
    println!(
        "  Carbs/day:      {}",
        show(&carb_summary(&window.carbs, ctx), |c| format!(
            "{:.1} g",
            c.daily_average_carbs
        ))
    );
    println!(
        "  Insulin/day:    {}",
        show(&insulin_summary(&window.insulin, ctx), |i| format!(
            "{:.1} units",
            i.daily_average_units
        ))
    );
    Ok(())
}

fn show<T>(metric: &Metric<T>, render: impl FnOnce(&T) -> String) -> String {
    match metric {
        Metric::Available { value } => render(value),
        Metric::Insufficient { needed, found } => {
            format!("insufficient data ({} of {})", found, needed)
        }
    }
}

fn cmd_streak(data_dir: &Path, ctx: &AnalysisContext) -> Result<()> {
    let repo = load_repository(&log_path(data_dir))?;
    let streak = streak_summary(&repo, ctx);
    let points = points_and_level(&repo, &streak);
    let achievements = evaluate_achievements(&repo, &streak, &points, ctx);

    println!("Current streak: {} days", streak.current);
    println!("Longest streak: {} days", streak.longest);
    println!("Active days:    {}", streak.total_days);
    println!();
    println!(
        "Points: {} (entries {} + streak bonus {})",
        points.total, points.entry_points, points.streak_bonus
    );
    println!("Level {}: {}", points.tier.rank, points.tier.name);
    if let Some(next) = points.next_tier {
        println!("  {} points to {}", points.points_to_next, next.name);
    }
    println!();
    if achievements.is_empty() {
        println!("No achievements yet");
    } else {
        println!("Achievements:");
        for a in achievements {
            println!("  ★ {} - {}", a.title(), a.description());
        }
    }
    Ok(())
}

fn cmd_meal(
    data_dir: &Path,
    text: &str,
    commit: bool,
    products: Option<&Path>,
    ctx: &AnalysisContext,
) -> Result<()> {
    let default_table = get_default_food_table();
    let extended;
    let table = match products {
        Some(path) => {
            extended = default_table.with_records(JsonProductCatalog::load(path).food_records());
            &extended
        }
        None => default_table,
    };

    let meal = parse_meal(text, table);

    if meal.fallback {
        println!("No known foods recognized; using a generic estimate.");
    }
    for item in &meal.items {
        let amount = match &item.unit {
            Some(unit) => format!("{} {}", item.quantity, unit),
            None => format!("{}", item.quantity),
        };
        println!(
            "  {:<8} {:<24} {:>6.1} g carbs {:>6.0} kcal",
            amount, item.name, item.carbs, item.calories
        );
    }
    println!(
        "Total: {:.1} g carbs, {:.0} kcal",
        meal.total_carbs, meal.total_calories
    );
    println!("Glycemic load: {}", meal.glycemic_load.label());

    if !commit {
        println!("\n[Not logged - rerun with --commit to save]");
        return Ok(());
    }

    let entries: Vec<LogEntry> = meal
        .to_carb_entries(ctx.now)
        .into_iter()
        .map(LogEntry::Carbs)
        .collect();
    let mut sink = JsonlSink::new(log_path(data_dir));
    let count = sink.append_all(&entries)?;

    println!("\n✓ Logged {} carb entries", count);
    Ok(())
}

fn cmd_import_csv(data_dir: &Path, file: &Path) -> Result<()> {
    let readings = import_glucose_csv(file)?;
    if readings.is_empty() {
        println!("No valid readings found in {}", file.display());
        return Ok(());
    }

    let entries: Vec<LogEntry> = readings.into_iter().map(LogEntry::Glucose).collect();
    let mut sink = JsonlSink::new(log_path(data_dir));
    let count = sink.append_all(&entries)?;

    println!("✓ Imported {} glucose readings", count);
    Ok(())
}

fn cmd_log(data_dir: &Path, entry: LogCommand, ctx: &AnalysisContext) -> Result<()> {
    let entry = match entry {
        LogCommand::Glucose { value } => LogEntry::Glucose(GlucoseReading {
            value,
            taken_at: ctx.now,
        }),
        LogCommand::Insulin { units, kind } => {
            if !(units > 0.0) {
                return Err(Error::InvalidEntry(format!(
                    "insulin units must be positive (got {})",
                    units
                )));
            }
            let kind = InsulinKind::parse(&kind)
                .ok_or_else(|| Error::InvalidEntry(format!("unknown insulin kind '{}'", kind)))?;
            LogEntry::Insulin(InsulinDose {
                units,
                kind,
                taken_at: ctx.now,
            })
        }
    };
    entry.validate()?;

    let mut sink = JsonlSink::new(log_path(data_dir));
    sink.append(&entry)?;

    println!("✓ Logged {} entry", entry.kind());
    Ok(())
}

fn cmd_lookup(barcode: &str, products: &Path) -> Result<()> {
    let catalog = JsonProductCatalog::load(products);

    let Some(product) = catalog.by_barcode(barcode) else {
        println!("No product found for barcode {}", barcode);
        return Ok(());
    };

    let name = product.product_name.as_deref().unwrap_or("(unnamed)");
    match product.brands.as_deref() {
        Some(brand) => println!("{} ({})", name, brand),
        None => println!("{}", name),
    }
    if let Some(grade) = &product.nutriscore_grade {
        println!("  Nutri-Score: {}", grade.to_uppercase());
    }
    if let Some(nova) = product.nova_group {
        println!("  NOVA group: {}", nova);
    }

    match normalize_product(&product) {
        Some(record) => {
            println!("  Food key: {}", record.key);
            println!("  Carbs per portion: {:.1} g", record.carbs_per_portion);
            println!("  Calories per portion: {:.0} kcal", record.calories_per_portion);
            println!("  Glycemic tag: {:?}", record.glycemic_tag);
        }
        None => println!("  No carbohydrate data available"),
    }
    Ok(())
}
