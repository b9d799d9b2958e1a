//! In-memory log snapshot handed to every calculation.
//!
//! The engine never mutates a repository it is given. Callers build one from
//! persisted entries (see [`crate::store`]) and pass it by reference.

use crate::types::{
    ActivitySession, CarbEntry, GlucoseReading, InsulinDose, MedicationDose, MoodCheckIn,
};
use crate::window::{filter_window, Period, Timestamped};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logged entry from any stream
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    Glucose(GlucoseReading),
    Carbs(CarbEntry),
    Insulin(InsulinDose),
    Medication(MedicationDose),
    Activity(ActivitySession),
    Mood(MoodCheckIn),
}

impl LogEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            LogEntry::Glucose(_) => "glucose",
            LogEntry::Carbs(_) => "carbs",
            LogEntry::Insulin(_) => "insulin",
            LogEntry::Medication(_) => "medication",
            LogEntry::Activity(_) => "activity",
            LogEntry::Mood(_) => "mood",
        }
    }

    /// Check the value ranges of the entry: glucose above zero, amounts not
    /// negative, mood ranks within 1..=5
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidEntry(msg));
        match self {
            LogEntry::Glucose(e) if !(e.value.is_finite() && e.value > 0.0) => {
                invalid(format!("glucose value must be positive (got {})", e.value))
            }
            LogEntry::Carbs(e) if !non_negative(e.carbs_grams) => {
                invalid(format!("carbs must not be negative (got {})", e.carbs_grams))
            }
            LogEntry::Insulin(e) if !non_negative(e.units) => {
                invalid(format!("insulin units must not be negative (got {})", e.units))
            }
            LogEntry::Activity(e)
                if !(non_negative(e.duration_min) && non_negative(e.calories_burned)) =>
            {
                invalid("activity duration and calories must not be negative".to_string())
            }
            LogEntry::Mood(e) => {
                for (name, rank) in [
                    ("mood", e.mood_rank),
                    ("energy", e.energy),
                    ("stress", e.stress),
                    ("sleep", e.sleep),
                ] {
                    if !(1..=5).contains(&rank) {
                        return invalid(format!("{} rank must be 1..=5 (got {})", name, rank));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

impl Timestamped for LogEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Glucose(e) => e.timestamp(),
            LogEntry::Carbs(e) => e.timestamp(),
            LogEntry::Insulin(e) => e.timestamp(),
            LogEntry::Medication(e) => e.timestamp(),
            LogEntry::Activity(e) => e.timestamp(),
            LogEntry::Mood(e) => e.timestamp(),
        }
    }
}

/// Typed, chronologically ordered collections of log entries
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LogRepository {
    pub glucose: Vec<GlucoseReading>,
    pub carbs: Vec<CarbEntry>,
    pub insulin: Vec<InsulinDose>,
    pub medications: Vec<MedicationDose>,
    pub activity: Vec<ActivitySession>,
    pub mood: Vec<MoodCheckIn>,
}

impl LogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from entries in any order
    pub fn from_entries(entries: impl IntoIterator<Item = LogEntry>) -> Self {
        let mut repo = Self::new();
        for entry in entries {
            repo.insert(entry);
        }
        repo.sort();
        repo
    }

    /// Add an entry, keeping its stream ordered by timestamp
    pub fn push(&mut self, entry: LogEntry) {
        self.insert(entry);
        self.sort();
    }

    fn insert(&mut self, entry: LogEntry) {
        match entry {
            LogEntry::Glucose(e) => self.glucose.push(e),
            LogEntry::Carbs(e) => self.carbs.push(e),
            LogEntry::Insulin(e) => self.insulin.push(e),
            LogEntry::Medication(e) => self.medications.push(e),
            LogEntry::Activity(e) => self.activity.push(e),
            LogEntry::Mood(e) => self.mood.push(e),
        }
    }

    // Stable sorts keep insertion order for equal timestamps
    fn sort(&mut self) {
        self.glucose.sort_by_key(|e| e.timestamp());
        self.carbs.sort_by_key(|e| e.timestamp());
        self.insulin.sort_by_key(|e| e.timestamp());
        self.medications.sort_by_key(|e| e.timestamp());
        self.activity.sort_by_key(|e| e.timestamp());
        self.mood.sort_by_key(|e| e.timestamp());
    }

    /// Total number of entries across all streams
    pub fn len(&self) -> usize {
        self.glucose.len()
            + self.carbs.len()
            + self.insulin.len()
            + self.medications.len()
            + self.activity.len()
            + self.mood.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All timestamps across every stream, unordered
    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.glucose
            .iter()
            .map(Timestamped::timestamp)
            .chain(self.carbs.iter().map(Timestamped::timestamp))
            .chain(self.insulin.iter().map(Timestamped::timestamp))
            .chain(self.medications.iter().map(Timestamped::timestamp))
            .chain(self.activity.iter().map(Timestamped::timestamp))
            .chain(self.mood.iter().map(Timestamped::timestamp))
    }

    /// Every entry as a tagged value, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        let mut all: Vec<LogEntry> = self
            .glucose
            .iter()
            .cloned()
            .map(LogEntry::Glucose)
            .chain(self.carbs.iter().cloned().map(LogEntry::Carbs))
            .chain(self.insulin.iter().cloned().map(LogEntry::Insulin))
            .chain(self.medications.iter().cloned().map(LogEntry::Medication))
            .chain(self.activity.iter().cloned().map(LogEntry::Activity))
            .chain(self.mood.iter().cloned().map(LogEntry::Mood))
            .collect();
        all.sort_by_key(|e| e.timestamp());
        all
    }

    /// Sub-snapshot of every stream restricted to `[now - period, now]`
    pub fn within(&self, period: Period, now: DateTime<Utc>) -> LogRepository {
        LogRepository {
            glucose: filter_window(&self.glucose, period, now),
            carbs: filter_window(&self.carbs, period, now),
            insulin: filter_window(&self.insulin, period, now),
            medications: filter_window(&self.medications, period, now),
            activity: filter_window(&self.activity, period, now),
            mood: filter_window(&self.mood, period, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InsulinKind;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_from_entries_sorts_each_stream() {
        let repo = LogRepository::from_entries(vec![
            LogEntry::Glucose(GlucoseReading {
                value: 150.0,
                taken_at: now(),
            }),
            LogEntry::Glucose(GlucoseReading {
                value: 120.0,
                taken_at: now() - Duration::hours(3),
            }),
            LogEntry::Insulin(InsulinDose {
                units: 4.0,
                kind: InsulinKind::Rapid,
                taken_at: now(),
            }),
        ]);

        assert_eq!(repo.len(), 3);
        assert_eq!(repo.glucose[0].value, 120.0);
        assert_eq!(repo.insulin.len(), 1);
    }

    #[test]
    fn test_within_filters_every_stream() {
        let mut repo = LogRepository::new();
        repo.push(LogEntry::Glucose(GlucoseReading {
            value: 100.0,
            taken_at: now() - Duration::days(20),
        }));
        repo.push(LogEntry::Carbs(CarbEntry {
            food_name: "toast".into(),
            carbs_grams: 15.0,
            calories_kcal: Some(80.0),
            logged_at: now() - Duration::days(2),
        }));

        let week = repo.within(Period::Week, now());
        assert!(week.glucose.is_empty());
        assert_eq!(week.carbs.len(), 1);

        // The source snapshot is untouched
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_entries_are_chronological() {
        let repo = LogRepository::from_entries(vec![
            LogEntry::Carbs(CarbEntry {
                food_name: "apple".into(),
                carbs_grams: 25.0,
                calories_kcal: None,
                logged_at: now(),
            }),
            LogEntry::Glucose(GlucoseReading {
                value: 100.0,
                taken_at: now() - Duration::hours(1),
            }),
        ]);

        let kinds: Vec<&str> = repo.entries().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["glucose", "carbs"]);
    }

    #[test]
    fn test_validate_value_ranges() {
        let glucose = |value| {
            LogEntry::Glucose(GlucoseReading {
                value,
                taken_at: now(),
            })
        };
        assert!(glucose(95.0).validate().is_ok());
        assert!(glucose(0.0).validate().is_err());
        assert!(glucose(-40.0).validate().is_err());
        assert!(glucose(f64::NAN).validate().is_err());

        let insulin = |units| {
            LogEntry::Insulin(InsulinDose {
                units,
                kind: InsulinKind::Long,
                taken_at: now(),
            })
        };
        assert!(insulin(0.0).validate().is_ok());
        assert!(insulin(-1.0).validate().is_err());

        let mood = |mood_rank, sleep| {
            LogEntry::Mood(MoodCheckIn {
                mood_rank,
                energy: 3,
                stress: 3,
                sleep,
                symptoms: Default::default(),
                glucose_at_time: None,
                taken_at: now(),
            })
        };
        assert!(mood(1, 5).validate().is_ok());
        assert!(mood(0, 3).validate().is_err());
        assert!(mood(3, 6).validate().is_err());
    }

    #[test]
    fn test_log_entry_json_is_tagged() {
        let entry = LogEntry::Glucose(GlucoseReading {
            value: 101.0,
            taken_at: now(),
        });
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"glucose\""));

        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
