//! Glucose calculators.
//!
//! Every function here is pure: the same readings, reference instant and
//! thresholds always give the same answer. Missing data is reported through
//! [`Metric::Insufficient`], never as a zero.

use crate::types::{AnalysisContext, GlucoseReading, Metric, MIN_STATISTICAL_SAMPLES};
use crate::window::filter_range;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Readings below this are "very low" regardless of user targets (mg/dL)
pub const VERY_LOW_LIMIT: f64 = 54.0;

/// Readings above this are "very high" regardless of user targets (mg/dL)
pub const VERY_HIGH_LIMIT: f64 = 250.0;

/// CV above this percentage is considered high variability
pub const HIGH_VARIABILITY_CV: u32 = 36;

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ============================================================================
// Average and eA1C
// ============================================================================

/// Arithmetic mean of all readings, rounded to an integer
pub fn average_glucose(readings: &[GlucoseReading]) -> Metric<u32> {
    match mean(readings.iter().map(|r| r.value)) {
        Some(avg) => Metric::available(avg.round() as u32),
        None => Metric::insufficient(1, 0),
    }
}

/// Estimated A1C from the average: `(avg + 46.7) / 28.7`, one decimal
///
/// Requires at least [`MIN_STATISTICAL_SAMPLES`] readings.
pub fn estimated_a1c(readings: &[GlucoseReading]) -> Metric<f64> {
    Metric::require(MIN_STATISTICAL_SAMPLES, readings.len(), || readings)
        .and_then(average_glucose)
        .map(|avg| round1((avg as f64 + 46.7) / 28.7))
}

// ============================================================================
// Time in Range
// ============================================================================

/// Reading counts per band
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BandCounts {
    pub very_low: usize,
    pub low: usize,
    pub in_range: usize,
    pub high: usize,
    pub very_high: usize,
}

/// Percentage of readings in each of the five glucose bands
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimeInRange {
    pub very_low: u32,
    pub low: u32,
    pub in_range: u32,
    pub high: u32,
    pub very_high: u32,
    pub counts: BandCounts,
    pub total: usize,
}

impl TimeInRange {
    /// Sum of the rounded percentages (100 ± rounding)
    pub fn percent_sum(&self) -> u32 {
        self.very_low + self.low + self.in_range + self.high + self.very_high
    }
}

/// Partition readings into veryLow(<54), low(<min), inRange([min,max]),
/// high(>max, <=250) and veryHigh(>250)
pub fn time_in_range(readings: &[GlucoseReading], min: f64, max: f64) -> Metric<TimeInRange> {
    if readings.is_empty() {
        return Metric::insufficient(1, 0);
    }

    let mut counts = BandCounts::default();
    for r in readings {
        let v = r.value;
        if v < VERY_LOW_LIMIT {
            counts.very_low += 1;
        } else if v < min {
            counts.low += 1;
        } else if v <= max {
            counts.in_range += 1;
        } else if v <= VERY_HIGH_LIMIT {
            counts.high += 1;
        } else {
            counts.very_high += 1;
        }
    }

    let total = readings.len();
    let [very_low, low, in_range, high, very_high] = band_percentages(
        [
            counts.very_low,
            counts.low,
            counts.in_range,
            counts.high,
            counts.very_high,
        ],
        total,
    );

    Metric::available(TimeInRange {
        very_low,
        low,
        in_range,
        high,
        very_high,
        counts,
        total,
    })
}

/// Round each share to a whole percent. When independent rounding drifts
/// more than one point from 100 (e.g. four bands at 12.5%), the bands with
/// the largest rounding error are nudged back until the sum is 100 ± 1.
fn band_percentages(counts: [usize; 5], total: usize) -> [u32; 5] {
    let exact = counts.map(|n| n as f64 / total as f64 * 100.0);
    let mut pct = exact.map(|p| p.round() as u32);

    let error = |pct: &[u32; 5], i: usize| pct[i] as f64 - exact[i];
    let sum = |pct: &[u32; 5]| pct.iter().sum::<u32>();

    while sum(&pct) > 101 {
        let i = (0..5)
            .filter(|&i| pct[i] > 0)
            .max_by(|&a, &b| error(&pct, a).total_cmp(&error(&pct, b)))
            .unwrap_or(0);
        pct[i] -= 1;
    }
    while sum(&pct) < 99 {
        let i = (0..5)
            .min_by(|&a, &b| error(&pct, a).total_cmp(&error(&pct, b)))
            .unwrap_or(0);
        pct[i] += 1;
    }
    pct
}

// ============================================================================
// Variability
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Variability {
    pub mean: f64,
    /// Population standard deviation, one decimal
    pub std_dev: f64,
    /// Coefficient of variation in percent, rounded
    pub cv: u32,
    pub high_variability: bool,
}

/// Population SD and CV of the readings. Requires at least
/// [`MIN_STATISTICAL_SAMPLES`] readings.
pub fn glucose_variability(readings: &[GlucoseReading]) -> Metric<Variability> {
    Metric::require(MIN_STATISTICAL_SAMPLES, readings.len(), || {
        let n = readings.len() as f64;
        let avg = readings.iter().map(|r| r.value).sum::<f64>() / n;
        let variance = readings
            .iter()
            .map(|r| (r.value - avg).powi(2))
            .sum::<f64>()
            / n;
        let sd = variance.sqrt();
        let cv = if avg > 0.0 {
            (sd / avg * 100.0).round() as u32
        } else {
            0
        };

        tracing::debug!(mean = avg, sd, cv, "Computed glucose variability");

        Variability {
            mean: round1(avg),
            std_dev: round1(sd),
            cv,
            high_variability: cv > HIGH_VARIABILITY_CV,
        }
    })
}

// ============================================================================
// Time of Day
// ============================================================================

/// Local time-of-day bucket
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [
        DayPart::Morning,
        DayPart::Afternoon,
        DayPart::Evening,
        DayPart::Night,
    ];

    /// Morning [5,12), Afternoon [12,17), Evening [17,21), Night otherwise
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=16 => DayPart::Afternoon,
            17..=20 => DayPart::Evening,
            _ => DayPart::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
            DayPart::Night => "Night",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BucketAverage {
    pub mean: f64,
    pub samples: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimeOfDayAverages {
    pub morning: Metric<BucketAverage>,
    pub afternoon: Metric<BucketAverage>,
    pub evening: Metric<BucketAverage>,
    pub night: Metric<BucketAverage>,
}

impl TimeOfDayAverages {
    pub fn get(&self, part: DayPart) -> &Metric<BucketAverage> {
        match part {
            DayPart::Morning => &self.morning,
            DayPart::Afternoon => &self.afternoon,
            DayPart::Evening => &self.evening,
            DayPart::Night => &self.night,
        }
    }
}

/// Mean glucose per local time-of-day bucket
pub fn time_of_day_averages(
    readings: &[GlucoseReading],
    ctx: &AnalysisContext,
) -> TimeOfDayAverages {
    let bucket = |part: DayPart| {
        let values: Vec<f64> = readings
            .iter()
            .filter(|r| DayPart::from_hour(ctx.local_hour(r.taken_at)) == part)
            .map(|r| r.value)
            .collect();
        match mean(values.iter().copied()) {
            Some(avg) => Metric::available(BucketAverage {
                mean: round1(avg),
                samples: values.len(),
            }),
            None => Metric::insufficient(1, 0),
        }
    };

    TimeOfDayAverages {
        morning: bucket(DayPart::Morning),
        afternoon: bucket(DayPart::Afternoon),
        evening: bucket(DayPart::Evening),
        night: bucket(DayPart::Night),
    }
}

// ============================================================================
// Weekly Comparison
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeeklyComparison {
    pub this_week: f64,
    pub last_week: f64,
    /// `this_week - last_week`, one decimal
    pub delta: f64,
    /// Lower average is better
    pub improved: bool,
}

/// Mean of `[now-7d, now)` against `[now-14d, now-7d)`. Both weeks must have
/// readings.
pub fn weekly_comparison(
    readings: &[GlucoseReading],
    now: DateTime<Utc>,
) -> Metric<WeeklyComparison> {
    let week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);

    let this_week = filter_range(readings, week_ago, now);
    let last_week = filter_range(readings, two_weeks_ago, week_ago);

    let this_avg = mean(this_week.iter().map(|r| r.value));
    let last_avg = mean(last_week.iter().map(|r| r.value));

    match (this_avg, last_avg) {
        (Some(this_week), Some(last_week)) => {
            let delta = round1(this_week - last_week);
            Metric::available(WeeklyComparison {
                this_week: round1(this_week),
                last_week: round1(last_week),
                delta,
                improved: delta < 0.0,
            })
        }
        _ => Metric::insufficient(1, this_week.len().min(last_week.len())),
    }
}

// ============================================================================
// Extremes
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlucoseExtremes {
    pub lowest: f64,
    pub highest: f64,
    pub count: usize,
}

pub fn glucose_extremes(readings: &[GlucoseReading]) -> Metric<GlucoseExtremes> {
    let mut iter = readings.iter().map(|r| r.value);
    let Some(first) = iter.next() else {
        return Metric::insufficient(1, 0);
    };
    let (lowest, highest) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Metric::available(GlucoseExtremes {
        lowest,
        highest,
        count: readings.len(),
    })
}

// ============================================================================
// Aggregate
// ============================================================================

/// All glucose calculator outputs for one window, computed once and shared
/// by the pattern detector and the report composer
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlucoseStats {
    pub average: Metric<u32>,
    pub estimated_a1c: Metric<f64>,
    pub time_in_range: Metric<TimeInRange>,
    pub variability: Metric<Variability>,
    pub time_of_day: TimeOfDayAverages,
    pub weekly: Metric<WeeklyComparison>,
    pub extremes: Metric<GlucoseExtremes>,
    pub reading_count: usize,
}

impl GlucoseStats {
    /// Compute every glucose metric for `window`. The weekly comparison is
    /// anchored at `ctx.now` and uses `all_readings` so it does not depend on
    /// the chosen period.
    pub fn compute(
        window: &[GlucoseReading],
        all_readings: &[GlucoseReading],
        ctx: &AnalysisContext,
    ) -> Self {
        let t = &ctx.thresholds;
        Self {
            average: average_glucose(window),
            estimated_a1c: estimated_a1c(window),
            time_in_range: time_in_range(window, t.glucose_min, t.glucose_max),
            variability: glucose_variability(window),
            time_of_day: time_of_day_averages(window, ctx),
            weekly: weekly_comparison(all_readings, ctx.now),
            extremes: glucose_extremes(window),
            reading_count: window.len(),
        }
    }
}
