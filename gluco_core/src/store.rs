//! JSONL log persistence and meter CSV import.
//!
//! Entries are appended to a JSON Lines file with file locking so the CLI can
//! be run concurrently. Reading never fails on a bad line; it is skipped with
//! a warning.

use crate::repository::{LogEntry, LogRepository};
use crate::types::GlucoseReading;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use fs2::FileExt;
use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the entry log inside the data directory
pub const LOG_FILE_NAME: &str = "logs.jsonl";

/// Path of the entry log for a data directory
pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE_NAME)
}

/// Entry sink trait for persisting log entries
pub trait EntrySink {
    fn append(&mut self, entry: &LogEntry) -> Result<()>;

    fn append_all(&mut self, entries: &[LogEntry]) -> Result<usize> {
        for entry in entries {
            self.append(entry)?;
        }
        Ok(entries.len())
    }
}

/// JSONL-based entry sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl EntrySink for JsonlSink {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(entry)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended {} entry to {:?}", entry.kind(), self.path);
        Ok(())
    }
}

/// Read all entries from a JSONL log, in file order.
///
/// Lines that do not parse, or whose values are out of range, are skipped.
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<LogEntry>(&line)
            .map_err(Error::from)
            .and_then(|entry| entry.validate().map(|()| entry));
        match parsed {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Skipping invalid log line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} entries from {:?}", entries.len(), path);
    Ok(entries)
}

/// Build a repository snapshot from a JSONL log. A missing file is empty.
pub fn load_repository(path: &Path) -> Result<LogRepository> {
    let repo = LogRepository::from_entries(read_entries(path)?);
    tracing::info!("Loaded {} log entries", repo.len());
    Ok(repo)
}

/// Meter export row
#[derive(Debug, Deserialize)]
struct CsvRow {
    taken_at: String,
    value: String,
}

impl TryFrom<CsvRow> for GlucoseReading {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let taken_at = parse_timestamp(row.taken_at.trim())?;

        let value: f64 = row
            .value
            .trim()
            .parse()
            .map_err(|e| Error::Import(format!("Invalid glucose value '{}': {}", row.value, e)))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::Import(format!(
                "Glucose value must be positive (got {})",
                value
            )));
        }

        Ok(GlucoseReading { value, taken_at })
    }
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as UTC
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::Import(format!("Invalid timestamp '{}'", s)))
}

/// Import glucose readings from a CSV with `taken_at,value` columns.
///
/// Rows that fail to parse are skipped with a warning. Returns readings in
/// file order.
pub fn import_glucose_csv(path: &Path) -> Result<Vec<GlucoseReading>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut readings = Vec::new();
    let mut skipped = 0;

    for (row_num, result) in reader.deserialize::<CsvRow>().enumerate() {
        let parsed = result
            .map_err(Error::from)
            .and_then(GlucoseReading::try_from);
        match parsed {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                skipped += 1;
                // +2: one for the header, one for 1-based numbering
                tracing::warn!("Skipping CSV row {}: {}", row_num + 2, e);
            }
        }
    }

    tracing::info!(
        "Imported {} glucose readings from {:?} ({} skipped)",
        readings.len(),
        path,
        skipped
    );
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CarbEntry, InsulinDose, InsulinKind};
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, 0, 0).unwrap()
    }

    fn glucose(value: f64, h: u32) -> LogEntry {
        LogEntry::Glucose(GlucoseReading {
            value,
            taken_at: at(h),
        })
    }

    #[test]
    fn test_append_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = log_path(temp_dir.path());

        let mut sink = JsonlSink::new(&path);
        sink.append(&glucose(110.0, 9)).unwrap();
        sink.append(&LogEntry::Insulin(InsulinDose {
            units: 4.0,
            kind: InsulinKind::Rapid,
            taken_at: at(8),
        }))
        .unwrap();
        sink.append(&LogEntry::Carbs(CarbEntry {
            food_name: "toast".into(),
            carbs_grams: 15.0,
            calories_kcal: Some(80.0),
            logged_at: at(8),
        }))
        .unwrap();

        let repo = load_repository(&path).unwrap();
        assert_eq!(repo.len(), 3);
        assert_eq!(repo.glucose[0].value, 110.0);
        assert_eq!(repo.insulin[0].kind, InsulinKind::Rapid);
        assert_eq!(repo.carbs[0].food_name, "toast");
    }

    #[test]
    fn test_append_all_keeps_file_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join(LOG_FILE_NAME);

        let mut sink = JsonlSink::new(&path);
        let written = sink
            .append_all(&[glucose(150.0, 12), glucose(95.0, 7)])
            .unwrap();
        assert_eq!(written, 2);

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries, vec![glucose(150.0, 12), glucose(95.0, 7)]);

        // The repository snapshot is chronological
        let repo = load_repository(&path).unwrap();
        assert_eq!(repo.glucose[0].value, 95.0);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = load_repository(&temp_dir.path().join("none.jsonl")).unwrap();
        assert!(repo.is_empty());
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = log_path(temp_dir.path());

        let good = serde_json::to_string(&glucose(120.0, 10)).unwrap();
        let contents = format!(
            "{good}\n{{ not json\n\n{{\"type\":\"unknown\",\"x\":1}}\n{good}\n",
            good = good
        );
        std::fs::write(&path, contents).unwrap();

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_out_of_range_entries_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = log_path(temp_dir.path());

        let good = serde_json::to_string(&glucose(120.0, 10)).unwrap();
        let contents = format!(
            "{good}\n\
             {{\"type\":\"glucose\",\"value\":-3,\"taken_at\":\"2024-03-10T11:00:00Z\"}}\n\
             {{\"type\":\"mood\",\"mood_rank\":9,\"energy\":3,\"stress\":3,\"sleep\":3,\"taken_at\":\"2024-03-10T11:00:00Z\"}}\n\
             {{\"type\":\"mood\",\"mood_rank\":4,\"energy\":3,\"stress\":2,\"sleep\":5,\"taken_at\":\"2024-03-10T12:00:00Z\"}}\n",
            good = good
        );
        std::fs::write(&path, contents).unwrap();

        let repo = load_repository(&path).unwrap();
        assert_eq!(repo.glucose.len(), 1);
        assert_eq!(repo.glucose[0].value, 120.0);
        assert_eq!(repo.mood.len(), 1);
        assert_eq!(repo.mood[0].mood_rank, 4);
    }

    #[test]
    fn test_import_glucose_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("meter.csv");
        std::fs::write(
            &path,
            "taken_at,value\n\
             2024-03-10T07:30:00Z,104\n\
             2024-03-10 12:15,168.5\n\
             not-a-date,120\n\
             2024-03-10T18:00:00+02:00,abc\n\
             2024-03-10T21:00:00Z,-5\n\
             2024-03-10T22:00:00+01:00, 131 \n",
        )
        .unwrap();

        let readings = import_glucose_csv(&path).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].value, 104.0);
        assert_eq!(readings[1].taken_at, Utc.with_ymd_and_hms(2024, 3, 10, 12, 15, 0).unwrap());
        assert_eq!(readings[2].taken_at, at(21));
        assert_eq!(readings[2].value, 131.0);
    }

    #[test]
    fn test_import_missing_file_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(import_glucose_csv(&temp_dir.path().join("none.csv")).is_err());
    }
}
