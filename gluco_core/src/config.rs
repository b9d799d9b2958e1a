//! Configuration file support for Gluco.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/gluco/config.toml`.
//! Thresholds are validated here, once, so calculators can trust them.

use crate::types::{AnalysisContext, Thresholds};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Largest accepted distance from UTC, in minutes
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub targets: TargetsConfig,

    #[serde(default)]
    pub insulin: InsulinConfig,

    #[serde(default)]
    pub locale: LocaleConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Glucose display unit. The engine always computes in mg/dL.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    #[default]
    MgDl,
    #[serde(rename = "mmol/L")]
    MmolL,
}

/// mg/dL per mmol/L for glucose
pub const MGDL_PER_MMOL: f64 = 18.0;

impl GlucoseUnit {
    pub fn label(&self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }

    /// Format a mg/dL value in this unit, with suffix
    pub fn format(&self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => format!("{:.0} mg/dL", mg_dl),
            GlucoseUnit::MmolL => format!("{:.1} mmol/L", mg_dl / MGDL_PER_MMOL),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

/// User targets and display preferences
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TargetsConfig {
    #[serde(default = "default_glucose_min")]
    pub glucose_min: f64,

    #[serde(default = "default_glucose_max")]
    pub glucose_max: f64,

    #[serde(default)]
    pub unit: GlucoseUnit,

    #[serde(default = "default_daily_carb_goal")]
    pub daily_carb_goal_grams: f64,

    #[serde(default)]
    pub weight_unit: WeightUnit,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            glucose_min: default_glucose_min(),
            glucose_max: default_glucose_max(),
            unit: GlucoseUnit::default(),
            daily_carb_goal_grams: default_daily_carb_goal(),
            weight_unit: WeightUnit::default(),
        }
    }
}

/// Insulin action parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InsulinConfig {
    #[serde(default = "default_active_duration_hours")]
    pub active_duration_hours: f64,
}

impl Default for InsulinConfig {
    fn default() -> Self {
        Self {
            active_duration_hours: default_active_duration_hours(),
        }
    }
}

/// Local time settings used for hour-of-day buckets and calendar days
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct LocaleConfig {
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("gluco")
}

fn default_glucose_min() -> f64 {
    70.0
}

fn default_glucose_max() -> f64 {
    180.0
}

fn default_daily_carb_goal() -> f64 {
    200.0
}

fn default_active_duration_hours() -> f64 {
    crate::insulin::DEFAULT_ACTIVE_DURATION_HOURS
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("gluco").join("config.toml")
    }

    /// Reject threshold combinations the calculators cannot work with
    pub fn validate(&self) -> Result<()> {
        let t = &self.targets;
        if !(t.glucose_min > 0.0) {
            return Err(Error::Config(format!(
                "glucose_min must be positive (got {})",
                t.glucose_min
            )));
        }
        if t.glucose_max <= t.glucose_min {
            return Err(Error::Config(format!(
                "glucose_max ({}) must be greater than glucose_min ({})",
                t.glucose_max, t.glucose_min
            )));
        }
        if !(t.daily_carb_goal_grams > 0.0) {
            return Err(Error::Config(format!(
                "daily_carb_goal_grams must be positive (got {})",
                t.daily_carb_goal_grams
            )));
        }
        if !(self.insulin.active_duration_hours > 0.0) {
            return Err(Error::Config(format!(
                "active_duration_hours must be positive (got {})",
                self.insulin.active_duration_hours
            )));
        }
        if self.locale.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(Error::Config(format!(
                "utc_offset_minutes must be within ±{} (got {})",
                MAX_UTC_OFFSET_MINUTES, self.locale.utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            glucose_min: self.targets.glucose_min,
            glucose_max: self.targets.glucose_max,
            daily_carb_goal_grams: self.targets.daily_carb_goal_grams,
            insulin_active_hours: self.insulin.active_duration_hours,
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.locale.utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "Invalid utc_offset_minutes: {}",
                self.locale.utc_offset_minutes
            ))
        })
    }

    /// Analysis context for a reference instant
    pub fn context(&self, now: DateTime<Utc>) -> Result<AnalysisContext> {
        self.validate()?;
        Ok(AnalysisContext {
            now,
            offset: self.utc_offset()?,
            thresholds: self.thresholds(),
        })
    }

    /// Save the current configuration to a specific path
    ///
    /// Writes to a temp file in the same directory and renames it over the
    /// target.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
