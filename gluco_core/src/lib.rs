#![forbid(unsafe_code)]

//! Core insight engine for the Gluco diabetes self-management tracker.
//!
//! This crate provides:
//! - Domain types (log entries, food records, the insufficient-data sentinel)
//! - Time windows and the in-memory log repository
//! - Metric calculators (glucose, insulin, carbs, medications, activity, mood)
//! - Streaks, points and levels
//! - Pattern detection and achievements
//! - Meal text parsing against a food table
//! - Report composition
//! - Persistence (JSONL log, meter CSV import) and configuration

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod window;
pub mod repository;
pub mod glucose;
pub mod insulin;
pub mod lifestyle;
pub mod streak;
pub mod progression;
pub mod patterns;
pub mod foods;
pub mod meal;
pub mod product;
pub mod store;
pub mod report;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, GlucoseUnit};
pub use window::{filter_range, filter_window, Period, Timestamped};
pub use repository::{LogEntry, LogRepository};
pub use glucose::GlucoseStats;
pub use patterns::{detect, detect_all, evaluate_achievements, Achievement, Insight, Severity};
pub use streak::{streak_summary, StreakSummary};
pub use progression::{points_and_level, PointsSummary};
pub use foods::{get_default_food_table, FoodTable};
pub use meal::{parse_meal, ParsedMeal};
pub use product::{normalize_product, JsonProductCatalog, ProductLookup, ProductRecord};
pub use store::{load_repository, EntrySink, JsonlSink};
pub use report::{compose_report, Report};
