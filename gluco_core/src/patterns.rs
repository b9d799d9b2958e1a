//! Pattern detection over calculator outputs.
//!
//! Behavioral insights come from a fixed, ordered rule list. The first rule
//! that matches (and has enough data) wins:
//!
//! 1. **Dawn phenomenon**: morning average above target max, >= 3 morning readings
//! 2. **Post-meal spike**: > 50% of midday/evening readings above target max, >= 3 readings
//! 3. **Good control**: time in range >= 80%
//! 4. **High variability**: CV > 36%
//! 5. **Evening elevation**: evening average above target max
//!
//! With no match a generic "keep logging" message is returned; an empty
//! window yields a fixed "no data yet" message.
//!
//! Achievements are evaluated independently and every satisfied one is
//! reported.

use crate::glucose::{time_in_range, DayPart, GlucoseStats};
use crate::progression::PointsSummary;
use crate::repository::LogRepository;
use crate::streak::StreakSummary;
use crate::types::{AnalysisContext, GlucoseReading};
use crate::window::Period;
use serde::Serialize;

/// Minimum morning readings for the dawn phenomenon rule
pub const DAWN_MIN_SAMPLES: usize = 3;

/// Minimum midday/evening readings for the post-meal spike rule
pub const POST_MEAL_MIN_SAMPLES: usize = 3;

/// Share of post-meal readings above target that counts as a spike pattern
pub const POST_MEAL_SPIKE_SHARE: f64 = 0.5;

/// Time in range at or above this is good control
pub const GOOD_CONTROL_TIR: u32 = 80;

pub const NO_DATA_MESSAGE: &str =
    "No glucose readings yet. Log a few readings to start seeing insights.";

pub const KEEP_LOGGING_MESSAGE: &str =
    "No strong patterns this period. Keep logging to sharpen your insights.";

// ============================================================================
// Insight Types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Alert,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
        }
    }

    /// Color tag for presentation layers
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Success => "green",
            Severity::Info => "blue",
            Severity::Warning => "amber",
            Severity::Alert => "red",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    NoData,
    KeepLogging,
    DawnPhenomenon,
    PostMealSpike,
    GoodControl,
    HighVariability,
    EveningElevation,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Insight {
    pub kind: InsightKind,
    pub severity: Severity,
    pub message: String,
}

impl Insight {
    fn new(kind: InsightKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Behavioral pattern rules in precedence order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternRule {
    DawnPhenomenon,
    PostMealSpike,
    GoodControl,
    HighVariability,
    EveningElevation,
}

pub const RULES: [PatternRule; 5] = [
    PatternRule::DawnPhenomenon,
    PatternRule::PostMealSpike,
    PatternRule::GoodControl,
    PatternRule::HighVariability,
    PatternRule::EveningElevation,
];

/// Share of midday/evening readings above `max`, with the sample count
fn post_meal_exceedance(
    readings: &[GlucoseReading],
    ctx: &AnalysisContext,
    max: f64,
) -> (f64, usize) {
    let post_meal: Vec<f64> = readings
        .iter()
        .filter(|r| {
            matches!(
                DayPart::from_hour(ctx.local_hour(r.taken_at)),
                DayPart::Afternoon | DayPart::Evening
            )
        })
        .map(|r| r.value)
        .collect();

    if post_meal.is_empty() {
        return (0.0, 0);
    }
    let above = post_meal.iter().filter(|&&v| v > max).count();
    (above as f64 / post_meal.len() as f64, post_meal.len())
}

impl PatternRule {
    /// Evaluate against one window. `None` means no match or not enough data.
    pub fn evaluate(
        &self,
        readings: &[GlucoseReading],
        stats: &GlucoseStats,
        ctx: &AnalysisContext,
    ) -> Option<Insight> {
        let max = ctx.thresholds.glucose_max;

        match self {
            PatternRule::DawnPhenomenon => {
                let morning = stats.time_of_day.morning.value()?;
                (morning.samples >= DAWN_MIN_SAMPLES && morning.mean > max).then(|| {
                    Insight::new(
                        InsightKind::DawnPhenomenon,
                        Severity::Warning,
                        format!(
                            "Morning readings average {:.0} mg/dL, above your {:.0} target. \
                             This can point to the dawn phenomenon; consider reviewing \
                             overnight and basal timing with your care team.",
                            morning.mean, max
                        ),
                    )
                })
            }

            PatternRule::PostMealSpike => {
                let (share, samples) = post_meal_exceedance(readings, ctx, max);
                (samples >= POST_MEAL_MIN_SAMPLES && share > POST_MEAL_SPIKE_SHARE).then(|| {
                    Insight::new(
                        InsightKind::PostMealSpike,
                        Severity::Warning,
                        format!(
                            "{:.0}% of your midday and evening readings are above {:.0} mg/dL. \
                             Meals may be causing spikes; try smaller carb portions or a \
                             short walk after eating.",
                            share * 100.0,
                            max
                        ),
                    )
                })
            }

            PatternRule::GoodControl => {
                let tir = stats.time_in_range.value()?;
                (tir.in_range >= GOOD_CONTROL_TIR).then(|| {
                    Insight::new(
                        InsightKind::GoodControl,
                        Severity::Success,
                        format!(
                            "Great control: {}% of readings were in range. Keep doing what \
                             you're doing!",
                            tir.in_range
                        ),
                    )
                })
            }

            PatternRule::HighVariability => {
                let v = stats.variability.value()?;
                v.high_variability.then(|| {
                    Insight::new(
                        InsightKind::HighVariability,
                        Severity::Alert,
                        format!(
                            "Glucose variability is high (CV {}%). Consistent meal timing and \
                             carb amounts can help smooth out swings.",
                            v.cv
                        ),
                    )
                })
            }

            PatternRule::EveningElevation => {
                let evening = stats.time_of_day.evening.value()?;
                (evening.mean > max).then(|| {
                    Insight::new(
                        InsightKind::EveningElevation,
                        Severity::Info,
                        format!(
                            "Evening readings average {:.0} mg/dL. Dinner composition or \
                             timing may be worth a look.",
                            evening.mean
                        ),
                    )
                })
            }
        }
    }
}

/// The single behavioral insight for a window
pub fn detect(
    readings: &[GlucoseReading],
    stats: &GlucoseStats,
    ctx: &AnalysisContext,
) -> Insight {
    if readings.is_empty() {
        return Insight::new(InsightKind::NoData, Severity::Info, NO_DATA_MESSAGE);
    }

    for rule in RULES {
        if let Some(insight) = rule.evaluate(readings, stats, ctx) {
            tracing::debug!("Pattern rule matched: {:?}", rule);
            return insight;
        }
    }

    Insight::new(InsightKind::KeepLogging, Severity::Info, KEEP_LOGGING_MESSAGE)
}

/// Every matching rule in precedence order. Falls back like [`detect`]
/// when nothing matches.
pub fn detect_all(
    readings: &[GlucoseReading],
    stats: &GlucoseStats,
    ctx: &AnalysisContext,
) -> Vec<Insight> {
    let matched: Vec<Insight> = RULES
        .iter()
        .filter_map(|rule| rule.evaluate(readings, stats, ctx))
        .collect();

    if matched.is_empty() {
        vec![detect(readings, stats, ctx)]
    } else {
        matched
    }
}

// ============================================================================
// Achievements
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstLog,
    ThreeDayStreak,
    WeekStreak,
    MonthStreak,
    Centurion,
    InRangeHero,
    MealTracker,
    ActiveLifestyle,
    MoodJournal,
    PerfectAdherence,
    LevelUp,
}

pub const ACHIEVEMENTS: [Achievement; 11] = [
    Achievement::FirstLog,
    Achievement::ThreeDayStreak,
    Achievement::WeekStreak,
    Achievement::MonthStreak,
    Achievement::Centurion,
    Achievement::InRangeHero,
    Achievement::MealTracker,
    Achievement::ActiveLifestyle,
    Achievement::MoodJournal,
    Achievement::PerfectAdherence,
    Achievement::LevelUp,
];

impl Achievement {
    pub fn title(&self) -> &'static str {
        match self {
            Achievement::FirstLog => "First Log",
            Achievement::ThreeDayStreak => "Three in a Row",
            Achievement::WeekStreak => "Week Warrior",
            Achievement::MonthStreak => "Monthly Master",
            Achievement::Centurion => "Centurion",
            Achievement::InRangeHero => "In-Range Hero",
            Achievement::MealTracker => "Meal Tracker",
            Achievement::ActiveLifestyle => "Active Lifestyle",
            Achievement::MoodJournal => "Mood Journal",
            Achievement::PerfectAdherence => "Perfect Adherence",
            Achievement::LevelUp => "Level Up",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstLog => "Logged your first entry",
            Achievement::ThreeDayStreak => "Logged 3 days in a row",
            Achievement::WeekStreak => "Logged 7 days in a row",
            Achievement::MonthStreak => "Logged 30 days in a row",
            Achievement::Centurion => "Recorded 100 glucose readings",
            Achievement::InRangeHero => "70% time in range over the last 14 days",
            Achievement::MealTracker => "Logged 50 meals",
            Achievement::ActiveLifestyle => "Logged 10 activity sessions",
            Achievement::MoodJournal => "Completed 14 mood check-ins",
            Achievement::PerfectAdherence => "Took every scheduled medication dose (7+)",
            Achievement::LevelUp => "Reached the Committed tier",
        }
    }

    fn is_earned(
        &self,
        repo: &LogRepository,
        streak: &StreakSummary,
        points: &PointsSummary,
        ctx: &AnalysisContext,
    ) -> bool {
        match self {
            Achievement::FirstLog => !repo.is_empty(),
            Achievement::ThreeDayStreak => streak.longest >= 3,
            Achievement::WeekStreak => streak.longest >= 7,
            Achievement::MonthStreak => streak.longest >= 30,
            Achievement::Centurion => repo.glucose.len() >= 100,
            Achievement::InRangeHero => {
                let recent = repo.within(Period::Fortnight, ctx.now).glucose;
                recent.len() >= 14
                    && time_in_range(&recent, ctx.thresholds.glucose_min, ctx.thresholds.glucose_max)
                        .value()
                        .is_some_and(|tir| tir.in_range >= 70)
            }
            Achievement::MealTracker => repo.carbs.len() >= 50,
            Achievement::ActiveLifestyle => repo.activity.len() >= 10,
            Achievement::MoodJournal => repo.mood.len() >= 14,
            Achievement::PerfectAdherence => {
                repo.medications.len() >= 7 && repo.medications.iter().all(|m| m.taken)
            }
            Achievement::LevelUp => points.tier.rank >= 3,
        }
    }
}

/// Every satisfied achievement, in table order
pub fn evaluate_achievements(
    repo: &LogRepository,
    streak: &StreakSummary,
    points: &PointsSummary,
    ctx: &AnalysisContext,
) -> Vec<Achievement> {
    ACHIEVEMENTS
        .into_iter()
        .filter(|a| a.is_earned(repo, streak, points, ctx))
        .collect()
}
