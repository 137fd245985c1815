use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::combinator::{Slice, SuccessorStrategy, total_subsets};
use crate::error::SubsetSumError;

/// Which evaluated subsets are handed to the report sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Only the final tallies are produced.
    #[default]
    Off,
    /// Every evaluated subset.
    All,
    /// Only subsets whose window has a missing sum.
    Failures,
}

impl ReportMode {
    pub fn should_emit(self, passed: bool) -> bool {
        match self {
            ReportMode::Off => false,
            ReportMode::All => true,
            ReportMode::Failures => !passed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Largest value allowed in a subset (M); also the pinned last element.
    pub max_value: u32,
    /// Number of elements per subset (N).
    pub subset_size: usize,
    /// Restrict the run to `[start, start + count)`. None sweeps everything.
    #[serde(default)]
    pub slice: Option<Slice>,
    #[serde(default)]
    pub strategy: SuccessorStrategy,
    #[serde(default)]
    pub report: ReportMode,
    /// Attach the step-by-step sum calculation to emitted reports.
    #[serde(default)]
    pub trace: bool,
    /// Save a checkpoint every this many subsets (0 = only at the end).
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u64,
    /// Log progress every this many subsets (0 disables progress lines).
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
    /// Worker threads for the multi-slice mode. 1 keeps the run sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Number of slices the range is split into when running in parallel.
    /// None uses one slice per worker.
    #[serde(default)]
    pub parallel_slices: Option<usize>,
    #[serde(default)]
    pub quiet: bool,
    /// JSON checkpoint file to resume from and save into.
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
}

fn default_checkpoint_every() -> u64 {
    10_000_000
}

fn default_progress_every() -> u64 {
    1_000_000
}

fn default_workers() -> usize {
    1
}

impl Config {
    /// Sequential full sweep with default cadence settings.
    pub fn new(max_value: u32, subset_size: usize) -> Self {
        Self {
            max_value,
            subset_size,
            slice: None,
            strategy: SuccessorStrategy::default(),
            report: ReportMode::default(),
            trace: false,
            checkpoint_every: default_checkpoint_every(),
            progress_every: default_progress_every(),
            workers: default_workers(),
            parallel_slices: None,
            quiet: false,
            checkpoint: None,
        }
    }

    pub fn with_slice(mut self, start: u64, count: u64) -> Self {
        self.slice = Some(Slice::new(start, count));
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.workers > 1 || self.parallel_slices.is_some_and(|slices| slices > 1)
    }

    /// Check the run parameters and return the total subset count.
    pub fn validate(&self) -> Result<u128, SubsetSumError> {
        if self.max_value == 0 {
            return Err(SubsetSumError::InvalidMaxValue);
        }
        if self.subset_size == 0 || self.subset_size as u64 > u64::from(self.max_value) {
            return Err(SubsetSumError::InvalidSubsetSize {
                max_value: self.max_value,
                subset_size: self.subset_size,
            });
        }
        let total = total_subsets(self.max_value, self.subset_size);
        if let Some(slice) = self.slice {
            if slice.count == 0 {
                return Err(SubsetSumError::EmptySlice);
            }
            if u128::from(slice.start) >= total {
                return Err(SubsetSumError::SliceOutOfRange {
                    start: slice.start,
                    total,
                });
            }
        }
        if self.is_parallel() && self.report != ReportMode::Off {
            return Err(SubsetSumError::IncompatibleOptions(
                "per-subset reports require a single worker".to_string(),
            ));
        }
        if self.is_parallel() && self.checkpoint.is_some() {
            return Err(SubsetSumError::IncompatibleOptions(
                "checkpoints require a single worker".to_string(),
            ));
        }
        Ok(total)
    }

    /// Short description used in checkpoint comparisons and logs.
    pub fn describe_run(&self) -> String {
        match self.slice {
            Some(slice) => format!(
                "M={} N={} slice {}+{}",
                self.max_value, self.subset_size, slice.start, slice.count
            ),
            None => format!("M={} N={} full sweep", self.max_value, self.subset_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_returns_total() {
        assert_eq!(Config::new(6, 3).validate().expect("valid"), 10);
        assert_eq!(Config::new(1, 1).validate().expect("valid"), 1);
    }

    #[test]
    fn validate_rejects_subset_larger_than_max() {
        let err = Config::new(3, 4).validate().expect_err("N > M");
        assert!(matches!(
            err,
            SubsetSumError::InvalidSubsetSize {
                max_value: 3,
                subset_size: 4
            }
        ));
        assert!(err.is_usage());
        assert!(matches!(
            Config::new(0, 0).validate(),
            Err(SubsetSumError::InvalidMaxValue)
        ));
    }

    #[test]
    fn validate_rejects_slice_start_at_total() {
        assert!(Config::new(6, 3).with_slice(9, 5).validate().is_ok());
        let err = Config::new(6, 3)
            .with_slice(10, 1)
            .validate()
            .expect_err("start == total");
        assert!(matches!(err, SubsetSumError::SliceOutOfRange { start: 10, total: 10 }));
        assert!(matches!(
            Config::new(6, 3).with_slice(0, 0).validate(),
            Err(SubsetSumError::EmptySlice)
        ));
    }

    #[test]
    fn parallel_runs_cannot_emit_reports() {
        let mut config = Config::new(8, 4);
        config.workers = 4;
        config.report = ReportMode::Failures;
        assert!(matches!(
            config.validate(),
            Err(SubsetSumError::IncompatibleOptions(_))
        ));
        config.report = ReportMode::Off;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parallel_runs_cannot_checkpoint() {
        let mut config = Config::new(8, 4);
        config.workers = 4;
        config.checkpoint = Some(PathBuf::from("run.json"));
        let err = config.validate().expect_err("parallel checkpoint");
        assert!(err.is_usage());
        assert!(err.to_string().contains("checkpoints require a single worker"));

        config.workers = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"max_value": 12, "subset_size": 5}"#).expect("json");
        assert_eq!(config.strategy, SuccessorStrategy::Positional);
        assert_eq!(config.report, ReportMode::Off);
        assert_eq!(config.workers, 1);
        assert!(config.slice.is_none());
        assert!(config.checkpoint.is_none());
    }

    #[test]
    fn report_mode_filters_passes() {
        assert!(!ReportMode::Off.should_emit(false));
        assert!(ReportMode::All.should_emit(true));
        assert!(!ReportMode::Failures.should_emit(true));
        assert!(ReportMode::Failures.should_emit(false));
    }
}
