//! Error types for the gluco_core library.
//!
//! Only I/O, configuration and import paths are fallible. Calculators report
//! missing data through [`crate::Metric`] instead of an error.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for gluco_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error (e.g. max threshold not above min)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A manually entered value is out of range or unknown
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// A row or record of an imported file could not be understood
    #[error("Import error: {0}")]
    Import(String),
}
