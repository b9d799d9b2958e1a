//! Core domain types for the Gluco insight engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Log entries for each tracked stream (glucose, carbs, insulin, ...)
//! - Food composition records used by the meal parser
//! - The insufficient-data sentinel shared by every calculator
//! - The analysis context (reference instant, local offset, thresholds)

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Minimum number of readings before statistical calculators (eA1C, CV)
/// produce a value.
pub const MIN_STATISTICAL_SAMPLES: usize = 5;

// ============================================================================
// Log Entry Types
// ============================================================================

/// A single blood glucose measurement in mg/dL
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlucoseReading {
    pub value: f64,
    pub taken_at: DateTime<Utc>,
}

/// A logged carbohydrate intake
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CarbEntry {
    pub food_name: String,
    pub carbs_grams: f64,
    #[serde(default)]
    pub calories_kcal: Option<f64>,
    pub logged_at: DateTime<Utc>,
}

/// Insulin preparation by action profile
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsulinKind {
    Rapid,
    Short,
    Intermediate,
    Long,
    Mixed,
}

impl InsulinKind {
    pub fn label(&self) -> &'static str {
        match self {
            InsulinKind::Rapid => "rapid",
            InsulinKind::Short => "short",
            InsulinKind::Intermediate => "intermediate",
            InsulinKind::Long => "long",
            InsulinKind::Mixed => "mixed",
        }
    }

    /// Parse a kind from user input, accepting a few common aliases
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "rapid" | "bolus" | "fast" => Some(InsulinKind::Rapid),
            "short" | "regular" => Some(InsulinKind::Short),
            "intermediate" | "nph" => Some(InsulinKind::Intermediate),
            "long" | "basal" => Some(InsulinKind::Long),
            "mixed" | "premix" => Some(InsulinKind::Mixed),
            _ => None,
        }
    }
}

/// A single insulin injection or bolus
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InsulinDose {
    pub units: f64,
    pub kind: InsulinKind,
    pub taken_at: DateTime<Utc>,
}

/// A scheduled medication dose, either taken or skipped
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicationDose {
    pub medication_id: String,
    pub taken: bool,
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub skip_reason: Option<String>,
}

/// A logged exercise session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivitySession {
    #[serde(default)]
    pub activity: Option<String>,
    pub duration_min: f64,
    pub calories_burned: f64,
    pub taken_at: DateTime<Utc>,
}

/// A mood check-in. All ranks are on a 1..=5 scale.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MoodCheckIn {
    pub mood_rank: u8,
    pub energy: u8,
    pub stress: u8,
    pub sleep: u8,
    #[serde(default)]
    pub symptoms: BTreeSet<String>,
    #[serde(default)]
    pub glucose_at_time: Option<f64>,
    pub taken_at: DateTime<Utc>,
}

// ============================================================================
// Food Composition
// ============================================================================

/// Glycemic index classification attached to a food record
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GlycemicTag {
    Low,
    Medium,
    High,
}

/// Reference nutrition for one portion of a food
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodCompositionRecord {
    /// Lowercase match key, possibly multi-word ("brown rice")
    pub key: String,
    pub carbs_per_portion: f64,
    pub calories_per_portion: f64,
    pub glycemic_tag: GlycemicTag,
}

// ============================================================================
// Insufficient-Data Sentinel
// ============================================================================

/// Result of a calculator: either a value, or an explicit statement that
/// there was not enough data. Never conflated with zero.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metric<T> {
    Available { value: T },
    Insufficient { needed: usize, found: usize },
}

impl<T> Metric<T> {
    pub fn available(value: T) -> Self {
        Metric::Available { value }
    }

    pub fn insufficient(needed: usize, found: usize) -> Self {
        Metric::Insufficient { needed, found }
    }

    /// Returns `Available` when `found >= needed`, computing the value lazily
    pub fn require(needed: usize, found: usize, f: impl FnOnce() -> T) -> Self {
        if found >= needed && found > 0 {
            Metric::available(f())
        } else {
            Metric::insufficient(needed.max(1), found)
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Available { value } => Some(value),
            Metric::Insufficient { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Metric::Available { value } => Some(value),
            Metric::Insufficient { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Available { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Available { value } => Metric::available(f(value)),
            Metric::Insufficient { needed, found } => Metric::insufficient(needed, found),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Metric<U>) -> Metric<U> {
        match self {
            Metric::Available { value } => f(value),
            Metric::Insufficient { needed, found } => Metric::insufficient(needed, found),
        }
    }
}

// ============================================================================
// Analysis Context
// ============================================================================

/// User-configured thresholds consumed by calculators and rules.
///
/// Validated once at configuration time (see [`crate::Config::validate`]).
#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds {
    pub glucose_min: f64,
    pub glucose_max: f64,
    pub daily_carb_goal_grams: f64,
    pub insulin_active_hours: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            glucose_min: 70.0,
            glucose_max: 180.0,
            daily_carb_goal_grams: 200.0,
            insulin_active_hours: 4.0,
        }
    }
}

/// Everything a calculation needs besides the log snapshot itself
#[derive(Clone, Debug)]
pub struct AnalysisContext {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
    pub thresholds: Thresholds,
}

impl AnalysisContext {
    /// Context at `now` in UTC with default thresholds
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self {
            now,
            offset: Utc.fix(),
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Local hour-of-day (0..24) of an instant
    pub fn local_hour(&self, t: DateTime<Utc>) -> u32 {
        t.with_timezone(&self.offset).hour()
    }

    /// Local calendar date of an instant
    pub fn local_date(&self, t: DateTime<Utc>) -> NaiveDate {
        t.with_timezone(&self.offset).date_naive()
    }

    /// Local calendar date of the reference instant
    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now)
    }
}
