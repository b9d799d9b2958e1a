//! Time window selection over timestamped log entries.

use crate::types::{
    ActivitySession, CarbEntry, GlucoseReading, InsulinDose, MedicationDose, MoodCheckIn,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything with a single instant on the timeline
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for GlucoseReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl Timestamped for CarbEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        self.logged_at
    }
}

impl Timestamped for InsulinDose {
    fn timestamp(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl Timestamped for MedicationDose {
    fn timestamp(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl Timestamped for ActivitySession {
    fn timestamp(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl Timestamped for MoodCheckIn {
    fn timestamp(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

/// Supported look-back periods
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Week,
    Fortnight,
    #[default]
    Month,
    Quarter,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Week,
        Period::Fortnight,
        Period::Month,
        Period::Quarter,
    ];

    pub fn days(&self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Fortnight => 14,
            Period::Month => 30,
            Period::Quarter => 90,
        }
    }

    /// Map a day count onto a supported period
    pub fn from_days(days: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.days() == days)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Week => "Last 7 days",
            Period::Fortnight => "Last 14 days",
            Period::Month => "Last 30 days",
            Period::Quarter => "Last 90 days",
        }
    }

    /// Earliest instant included in the window ending at `now`
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keep entries with `now - period <= t <= now`, preserving order
pub fn filter_window<T: Timestamped + Clone>(
    entries: &[T],
    period: Period,
    now: DateTime<Utc>,
) -> Vec<T> {
    let start = period.start(now);
    entries
        .iter()
        .filter(|e| {
            let t = e.timestamp();
            t >= start && t <= now
        })
        .cloned()
        .collect()
}

/// Keep entries with `start <= t < end`, preserving order
pub fn filter_range<'a, T: Timestamped>(
    entries: &'a [T],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&'a T> {
    entries
        .iter()
        .filter(|e| {
            let t = e.timestamp();
            t >= start && t < end
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(value: f64, t: DateTime<Utc>) -> GlucoseReading {
        GlucoseReading { value, taken_at: t }
    }

    #[test]
    fn test_from_days() {
        assert_eq!(Period::from_days(7), Some(Period::Week));
        assert_eq!(Period::from_days(90), Some(Period::Quarter));
        assert_eq!(Period::from_days(10), None);
    }

    #[test]
    fn test_filter_window_is_inclusive_and_ordered() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let entries = vec![
            reading(100.0, now - Duration::days(8)),
            reading(110.0, now - Duration::days(7)), // boundary, kept
            reading(120.0, now - Duration::days(3)),
            reading(130.0, now),
            reading(140.0, now + Duration::minutes(1)), // future, dropped
        ];

        let week = filter_window(&entries, Period::Week, now);
        let values: Vec<f64> = week.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![110.0, 120.0, 130.0]);
    }

    #[test]
    fn test_filter_window_reinvocable_with_other_periods() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let entries = vec![
            reading(100.0, now - Duration::days(60)),
            reading(110.0, now - Duration::days(20)),
            reading(120.0, now - Duration::days(1)),
        ];

        assert_eq!(filter_window(&entries, Period::Week, now).len(), 1);
        assert_eq!(filter_window(&entries, Period::Month, now).len(), 2);
        assert_eq!(filter_window(&entries, Period::Quarter, now).len(), 3);
    }

    #[test]
    fn test_filter_range_is_half_open() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let entries = vec![
            reading(100.0, now - Duration::days(7)),
            reading(110.0, now - Duration::days(1)),
            reading(120.0, now),
        ];

        let range = filter_range(&entries, now - Duration::days(7), now);
        assert_eq!(range.len(), 2);
    }
}
