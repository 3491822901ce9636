use thiserror::Error;

use crate::object::BatchSize;

/// Main error type for the Data Cockpit system
#[derive(Error, Debug)]
pub enum CockpitError {
    #[error("Benchmark error: {0}")]
    Benchmark(#[from] BenchmarkError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Terminal failures of a batch-size sweep
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BenchmarkError {
    #[error("Invalid batch size range: min {min}, max {max}, step {step}")]
    InvalidRange {
        min: BatchSize,
        max: BatchSize,
        step: BatchSize,
    },

    #[error("Benchmarking produced no valid results for {object} ({attempted} batch sizes attempted)")]
    NoValidResults { object: String, attempted: usize },

    #[error("Benchmarking is enabled but has not been run for {object}")]
    NotRun { object: String },
}

/// Failure of a single timing call; absorbed by the sweep
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Evaluation failed: {message}")]
    Failed { message: String },

    #[error("Timing function returned an invalid elapsed time: {value}")]
    InvalidElapsed { value: f64 },
}

impl EvaluationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Object store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Container not found: {container}")]
    ContainerNotFound { container: String },

    #[error("Listing failed for {container}: {message}")]
    ListingFailed { container: String, message: String },

    #[error("Invalid continuation token: {token}")]
    InvalidContinuationToken { token: String },
}

/// Dataset selection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No dataset selected")]
    NoDatasetSelected,
}

/// Result type alias for Data Cockpit operations
pub type CockpitResult<T> = Result<T, CockpitError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::CockpitError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::CockpitError::Config(format!($($arg)*))
    };
}
