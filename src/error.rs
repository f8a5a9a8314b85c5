//! Unified error hierarchy for stridekit
//!
//! Construction-invariant violations, operational-state errors and storage
//! failures each get their own variant so callers can report them precisely.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level error type for all stridekit operations
#[derive(Debug, Error)]
pub enum PlanError {
    /// Profile or race built with inconsistent data
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation not allowed in the plan's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Plan storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors (JSON, CSV, TOML)
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Invariant violations detected while building a race or a profile
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Plan start date {date} is not a Monday")]
    StartNotMonday { date: NaiveDate },

    #[error("Race date {date} is not a Sunday")]
    RaceNotSunday { date: NaiveDate },

    #[error("Only {weeks} weeks between start and race, at least {required} required")]
    InsufficientLeadTime { weeks: i64, required: u32 },

    #[error("Reference paces must be strictly increasing: 5K < 10K < half marathon < marathon")]
    PaceOrder,

    #[error("Minimum volume {min} km exceeds maximum volume {max} km")]
    VolumeOrder { min: Decimal, max: Decimal },

    #[error("Weekly volume must be positive, got {value} km")]
    NonPositiveVolume { value: Decimal },

    #[error("Sessions per week must be between {min} and {max}, got {value}")]
    SessionsOutOfRange { value: u8, min: u8, max: u8 },

    #[error("Intermediate race on {date} is outside the plan range {start} to {end}")]
    RaceOutsideRange {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Two intermediate races share the date {date}")]
    DuplicateRaceDate { date: NaiveDate },

    #[error("Race on {date} has no distance")]
    MissingDistance { date: NaiveDate },

    #[error("Main race on {date} has no target time")]
    MissingTargetTime { date: NaiveDate },

    #[error("Invalid pace: {0}")]
    InvalidPace(String),
}

/// Plan repository errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// No plan stored under this key
    #[error("Plan not found: {key}")]
    NotFound { key: String },

    /// Stored document could not be decoded
    #[error("Stored plan {key} is corrupted: {reason}")]
    Corrupted { key: String, reason: String },

    /// Key contains characters that cannot name a file
    #[error("Invalid plan key: {key}")]
    InvalidKey { key: String },
}

/// Result type alias for stridekit operations
pub type Result<T> = std::result::Result<T, PlanError>;

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for PlanError {
    fn from(err: csv::Error) -> Self {
        PlanError::Serialization(err.to_string())
    }
}

impl PlanError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlanError::Validation(_) => ErrorSeverity::Warning,
            PlanError::InvalidState(_) => ErrorSeverity::Warning,
            PlanError::Storage(StorageError::NotFound { .. }) => ErrorSeverity::Warning,
            PlanError::Storage(_) => ErrorSeverity::Error,
            PlanError::Configuration(_) => ErrorSeverity::Error,
            PlanError::Io(_) => ErrorSeverity::Error,
            PlanError::Serialization(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlanError::Validation(err) => format!("Please check your input: {}", err),
            PlanError::InvalidState(reason) => {
                format!("This plan cannot be adjusted: {}", reason)
            }
            PlanError::Storage(StorageError::NotFound { key }) => {
                format!("No saved plan named '{}'", key)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation
    Error,
    /// Caller input problem, reported back to the user
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
