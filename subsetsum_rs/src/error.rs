use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the sweep library.
///
/// Variants for which [`SubsetSumError::is_usage`] returns true describe
/// invalid run parameters; they are raised before any subset is evaluated.
#[derive(Debug, Error)]
pub enum SubsetSumError {
    #[error("max value must be at least 1")]
    InvalidMaxValue,

    #[error("subset size {subset_size} must be between 1 and the max value {max_value}")]
    InvalidSubsetSize { max_value: u32, subset_size: usize },

    #[error("starting subset [{start}] >= total subsets [{total}]")]
    SliceOutOfRange { start: u64, total: u128 },

    #[error("slice count must be at least 1")]
    EmptySlice,

    #[error("{0}")]
    IncompatibleOptions(String),

    #[error("checkpoint belongs to {found}, but this run is {expected}")]
    CheckpointMismatch { expected: String, found: String },

    #[error("total subset count {0} does not fit in a 64-bit iteration index")]
    IndexOverflow(u128),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("checkpoint I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write subset report: {0}")]
    Report(#[source] std::io::Error),
}

impl SubsetSumError {
    /// True for errors caused by the caller's parameters rather than the
    /// environment. The command line prints these and exits cleanly.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            SubsetSumError::InvalidMaxValue
                | SubsetSumError::InvalidSubsetSize { .. }
                | SubsetSumError::SliceOutOfRange { .. }
                | SubsetSumError::EmptySlice
                | SubsetSumError::IncompatibleOptions(_)
                | SubsetSumError::CheckpointMismatch { .. }
        )
    }
}

/// The exact and floating-point subset totals disagree.
///
/// This is informational: the exact count drives enumeration, the estimate
/// only mirrors the factorial-ratio figure reported alongside results.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("expected total estimate {estimate} differs from exact count {exact}")]
pub struct PrecisionMismatch {
    pub exact: u128,
    pub estimate: f64,
}
