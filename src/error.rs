use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Station {station_id} has no region mapping")]
    UnmappedStation { station_id: String },

    #[error("Station {station_id} maps to undeclared region {region_id}")]
    UnknownRegion {
        station_id: String,
        region_id: String,
    },

    #[error("Invalid heat threshold: {0}°C")]
    InvalidThreshold(f64),

    #[error("Integrity violation: expected {expected} joined rows, got {actual}")]
    IntegrityViolation { expected: usize, actual: usize },

    #[error("Daily load table holds more than one row for region {region_id} on {day}")]
    DuplicateLoadKey { region_id: String, day: NaiveDate },

    #[error("Heatwave flags are not aligned with daily temperatures at row {row}")]
    MisalignedFlags { row: usize },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Output directory {} is locked by another run", .0.display())]
    RunLocked(PathBuf),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Configuration failures abort a run before any table is rebuilt.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProcessingError::Configuration(_)
                | ProcessingError::ConfigSource(_)
                | ProcessingError::Validation(_)
                | ProcessingError::UnmappedStation { .. }
                | ProcessingError::UnknownRegion { .. }
                | ProcessingError::InvalidThreshold(_)
        )
    }

    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            ProcessingError::IntegrityViolation { .. }
                | ProcessingError::DuplicateLoadKey { .. }
                | ProcessingError::MisalignedFlags { .. }
        )
    }
}
