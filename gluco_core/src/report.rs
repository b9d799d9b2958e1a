//! Plain-text report composition.
//!
//! A report always has the same six sections in the same order. Sections with
//! no underlying entries keep their header and show a placeholder line.

use crate::config::GlucoseUnit;
use crate::glucose::{DayPart, GlucoseStats};
use crate::insulin::insulin_summary;
use crate::lifestyle::{activity_summary, carb_summary, medication_adherence, mood_summary};
use crate::patterns::{detect, evaluate_achievements, Insight};
use crate::progression::points_and_level;
use crate::repository::LogRepository;
use crate::streak::streak_summary;
use crate::types::{AnalysisContext, Metric};
use crate::window::Period;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub const REPORT_TITLE: &str = "Gluco Health Report";

pub const DISCLAIMER: &str =
    "For personal tracking only. This report is not medical advice; discuss changes with your care team.";

pub const NO_DATA_PLACEHOLDER: &str = "No data for this period";

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<String>,
    /// True when the section had no underlying entries
    pub empty: bool,
}

impl ReportSection {
    fn new(title: &str, lines: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            lines,
            empty: false,
        }
    }

    fn no_data(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: vec![NO_DATA_PLACEHOLDER.to_string()],
            empty: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Report {
    pub title: String,
    pub period: Period,
    pub generated_at: DateTime<Utc>,
    /// Local rendering of `generated_at`
    pub generated_local: String,
    pub disclaimer: String,
    pub insight: Insight,
    pub sections: Vec<ReportSection>,
    pub footer: Vec<String>,
}

impl Report {
    pub fn section(&self, title: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.title == title)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} - {}", self.title, self.period)?;
        writeln!(f, "Generated {}", self.generated_local)?;
        writeln!(f, "{}", self.disclaimer)?;
        writeln!(f)?;
        writeln!(
            f,
            "[{}] {}",
            self.insight.severity.label().to_uppercase(),
            self.insight.message
        )?;

        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "== {} ==", section.title)?;
            for line in &section.lines {
                writeln!(f, "  {}", line)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "== Progress ==")?;
        for line in &self.footer {
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }
}

fn insufficient<T>(metric: &Metric<T>) -> String {
    match metric {
        Metric::Available { .. } => String::new(),
        Metric::Insufficient { needed, found } => {
            format!("insufficient data (needs {}, has {})", needed, found)
        }
    }
}

/// `label: value` for an available metric, the insufficient text otherwise
fn metric_line<T>(label: &str, metric: &Metric<T>, render: impl FnOnce(&T) -> String) -> String {
    match metric.value() {
        Some(value) => format!("{}: {}", label, render(value)),
        None => format!("{}: {}", label, insufficient(metric)),
    }
}

fn glucose_section(stats: &GlucoseStats, unit: GlucoseUnit) -> ReportSection {
    const TITLE: &str = "Glucose";
    if stats.reading_count == 0 {
        return ReportSection::no_data(TITLE);
    }

    let mut lines = vec![format!("Readings: {}", stats.reading_count)];
    lines.push(metric_line("Average", &stats.average, |avg| {
        unit.format(f64::from(*avg))
    }));
    lines.push(metric_line("Estimated A1C", &stats.estimated_a1c, |a1c| {
        format!("{:.1}%", a1c)
    }));
    lines.push(metric_line("Time in range", &stats.time_in_range, |tir| {
        format!(
            "{}% (very low {}%, low {}%, high {}%, very high {}%)",
            tir.in_range, tir.very_low, tir.low, tir.high, tir.very_high
        )
    }));
    lines.push(metric_line("Variability", &stats.variability, |v| {
        let label = if v.high_variability { "high" } else { "stable" };
        format!("CV {}% ({})", v.cv, label)
    }));
    lines.push(metric_line("Range", &stats.extremes, |e| {
        format!("{} to {}", unit.format(e.lowest), unit.format(e.highest))
    }));
    for part in DayPart::ALL {
        lines.push(metric_line(part.label(), stats.time_of_day.get(part), |b| {
            format!("{} ({} readings)", unit.format(b.mean), b.samples)
        }));
    }
    lines.push(metric_line("This week vs last", &stats.weekly, |w| {
        let trend = if w.improved { "improved" } else { "not improved" };
        format!(
            "{} vs {} ({})",
            unit.format(w.this_week),
            unit.format(w.last_week),
            trend
        )
    }));

    ReportSection::new(TITLE, lines)
}

fn meals_section(window: &LogRepository, ctx: &AnalysisContext) -> ReportSection {
    const TITLE: &str = "Meals";
    let Some(carbs) = carb_summary(&window.carbs, ctx).into_value() else {
        return ReportSection::no_data(TITLE);
    };

    ReportSection::new(
        TITLE,
        vec![
            format!("Entries: {}", carbs.entry_count),
            format!("Total carbs: {:.1} g", carbs.total_carbs),
            format!("Total calories: {:.0} kcal", carbs.total_calories),
            format!(
                "Daily average: {:.1} g (goal {:.0} g)",
                carbs.daily_average_carbs, ctx.thresholds.daily_carb_goal_grams
            ),
            format!(
                "Days over goal: {} of {}",
                carbs.days_over_goal, carbs.logged_days
            ),
        ],
    )
}

fn insulin_section(window: &LogRepository, ctx: &AnalysisContext) -> ReportSection {
    const TITLE: &str = "Insulin";
    let Some(summary) = insulin_summary(&window.insulin, ctx).into_value() else {
        return ReportSection::no_data(TITLE);
    };

    let by_kind = summary
        .units_by_kind
        .iter()
        .map(|(kind, units)| format!("{} {:.1} u", kind.label(), units))
        .collect::<Vec<_>>()
        .join(", ");

    ReportSection::new(
        TITLE,
        vec![
            format!(
                "Doses: {} ({:.1} units total)",
                summary.dose_count, summary.total_units
            ),
            format!("By kind: {}", by_kind),
            format!("Daily average: {:.1} units", summary.daily_average_units),
            format!("Insulin on board: {:.2} units", summary.insulin_on_board),
        ],
    )
}

fn medications_section(window: &LogRepository) -> ReportSection {
    const TITLE: &str = "Medications";
    let Some(adherence) = medication_adherence(&window.medications).into_value() else {
        return ReportSection::no_data(TITLE);
    };

    let mut lines = vec![format!(
        "Adherence: {}% ({} of {} doses taken)",
        adherence.adherence_pct, adherence.taken, adherence.scheduled
    )];
    if !adherence.skip_reasons.is_empty() {
        let reasons = adherence
            .skip_reasons
            .iter()
            .map(|(reason, count)| format!("{} ({})", reason, count))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Skip reasons: {}", reasons));
    }
    ReportSection::new(TITLE, lines)
}

fn activity_section(window: &LogRepository) -> ReportSection {
    const TITLE: &str = "Activity";
    let Some(activity) = activity_summary(&window.activity).into_value() else {
        return ReportSection::no_data(TITLE);
    };

    ReportSection::new(
        TITLE,
        vec![
            format!("Sessions: {}", activity.sessions),
            format!(
                "Total: {:.0} min, {:.0} kcal burned",
                activity.total_minutes, activity.total_calories
            ),
            format!("Average session: {:.1} min", activity.average_minutes),
        ],
    )
}

fn mood_section(window: &LogRepository, unit: GlucoseUnit) -> ReportSection {
    const TITLE: &str = "Mood";
    let Some(mood) = mood_summary(&window.mood).into_value() else {
        return ReportSection::no_data(TITLE);
    };

    let mut lines = vec![
        format!("Check-ins: {}", mood.check_ins),
        format!(
            "Averages: mood {:.1}, energy {:.1}, stress {:.1}, sleep {:.1}",
            mood.average_mood, mood.average_energy, mood.average_stress, mood.average_sleep
        ),
    ];
    if !mood.top_symptoms.is_empty() {
        let symptoms = mood
            .top_symptoms
            .iter()
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Top symptoms: {}", symptoms));
    }
    if let Some(g) = mood.glucose_at_lowest_mood {
        lines.push(format!("Glucose at lowest mood: {}", unit.format(g)));
    }
    if let Some(g) = mood.glucose_at_highest_mood {
        lines.push(format!("Glucose at highest mood: {}", unit.format(g)));
    }
    ReportSection::new(TITLE, lines)
}

fn footer(repo: &LogRepository, ctx: &AnalysisContext) -> Vec<String> {
    let streak = streak_summary(repo, ctx);
    let points = points_and_level(repo, &streak);
    let achievements = evaluate_achievements(repo, &streak, &points, ctx);

    let mut lines = vec![
        format!(
            "Streak: {} days (longest {}, {} active days)",
            streak.current, streak.longest, streak.total_days
        ),
        match points.next_tier {
            Some(next) => format!(
                "Points: {} - {} ({} to {})",
                points.total, points.tier.name, points.points_to_next, next.name
            ),
            None => format!("Points: {} - {}", points.total, points.tier.name),
        },
    ];

    if achievements.is_empty() {
        lines.push("Achievements: none yet".to_string());
    } else {
        let titles = achievements
            .iter()
            .map(|a| a.title())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Achievements: {}", titles));
    }
    lines
}

/// Compose the report for `period` ending at `ctx.now`
pub fn compose_report(
    repo: &LogRepository,
    period: Period,
    ctx: &AnalysisContext,
    unit: GlucoseUnit,
) -> Report {
    let window = repo.within(period, ctx.now);
    let stats = GlucoseStats::compute(&window.glucose, &repo.glucose, ctx);
    let insight = detect(&window.glucose, &stats, ctx);

    let sections = vec![
        glucose_section(&stats, unit),
        meals_section(&window, ctx),
        insulin_section(&window, ctx),
        medications_section(&window),
        activity_section(&window),
        mood_section(&window, unit),
    ];

    tracing::debug!(
        "Composed {} report over {} entries",
        period.label(),
        window.len()
    );

    Report {
        title: REPORT_TITLE.to_string(),
        period,
        generated_at: ctx.now,
        generated_local: ctx
            .now
            .with_timezone(&ctx.offset)
            .format("%Y-%m-%d %H:%M %:z")
            .to_string(),
        disclaimer: DISCLAIMER.to_string(),
        insight,
        sections,
        footer: footer(repo, ctx),
    }
}
