use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::combinator::{
    ExpectedTotal, Slice, SubsetEnumerator, SuccessorStrategy, expected_total, plan_slices,
};
use crate::completeness::check_subset;
use crate::config::Config;
use crate::error::{PrecisionMismatch, SubsetSumError};
use crate::progress::{ProgressTracker, Tally};
use crate::report::{ReportSink, SubsetReport, format_duration, format_int};
use crate::sumset::SumsetEngine;

/// Outcome of a sweep.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tally: Tally,
    /// Index range that was requested.
    pub range: Slice,
    /// True when the whole enumeration was requested.
    pub full_sweep: bool,
    /// Exact and estimated totals, only computed for full sweeps.
    pub expected: Option<ExpectedTotal>,
    pub precision_mismatch: Option<PrecisionMismatch>,
    /// The tallied count differs from the exact total (full sweeps only).
    pub count_mismatch: bool,
    /// Absolute index the run resumed from, when a checkpoint was used.
    pub resumed_at: Option<u64>,
    pub elapsed: Duration,
}

/// Drives enumeration, evaluation, tallying, reporting and checkpointing.
#[derive(Debug, Clone)]
pub struct SweepDriver {
    config: Config,
    total: u128,
}

impl SweepDriver {
    pub fn new(config: Config) -> Result<Self, SubsetSumError> {
        let total = config.validate()?;
        Ok(Self { config, total })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of subsets in the full enumeration.
    pub fn total_subsets(&self) -> u128 {
        self.total
    }

    /// The index range this run covers. Full sweeps must fit a `u64` index.
    pub fn range(&self) -> Result<Slice, SubsetSumError> {
        match self.config.slice {
            Some(slice) => Ok(slice),
            None => {
                let count = u64::try_from(self.total)
                    .map_err(|_| SubsetSumError::IndexOverflow(self.total))?;
                Ok(Slice::new(0, count))
            }
        }
    }

    /// Run the configured sweep. Parallel configurations are routed to
    /// [`run_parallel`](Self::run_parallel), which takes neither a sink nor
    /// a checkpoint store.
    pub fn run(
        &self,
        sink: &mut dyn ReportSink,
        mut store: Option<&mut dyn CheckpointStore>,
    ) -> Result<RunSummary, SubsetSumError> {
        if self.config.is_parallel() {
            if store.is_some() {
                return Err(SubsetSumError::IncompatibleOptions(
                    "checkpoints require a single worker".to_string(),
                ));
            }
            return self.run_parallel();
        }

        let started = Instant::now();
        let range = self.range()?;
        let max_value = self.config.max_value;
        let subset_size = self.config.subset_size;

        let mut tally = Tally::default();
        let mut resumed_at = None;
        if let Some(store) = store.as_deref_mut()
            && let Some(checkpoint) = store.load()?
        {
            checkpoint.ensure_matches(&self.config)?;
            tally = checkpoint.tally();
            let position = range.start.saturating_add(tally.iterations);
            info!(
                resume_index = %format_int(position),
                pass = %format_int(tally.pass),
                fail = %format_int(tally.fail),
                "Resuming from checkpoint"
            );
            resumed_at = Some(position);
        }

        if !self.config.quiet {
            info!(
                max_value,
                subset_size,
                strategy = ?self.config.strategy,
                start = %format_int(range.start),
                count = %format_int(range.count),
                total_subsets = %format_int(self.total),
                "Starting sweep"
            );
        }

        let mut tracker = ProgressTracker::new(tally.iterations, Some(range.count));
        if tracker.has_remaining() {
            let start_index = u128::from(range.start) + u128::from(tally.iterations);
            let mut enumerator = SubsetEnumerator::starting_at(
                max_value,
                subset_size,
                start_index,
                self.config.strategy,
            );
            let mut engine = SumsetEngine::new(max_value, subset_size);

            while let Some(subset) = enumerator.current() {
                let verdict = check_subset(&mut engine, subset);
                tally.record(verdict.passed);

                if self.config.report.should_emit(verdict.passed) {
                    let trace = self
                        .config
                        .trace
                        .then(|| engine.accumulate_traced(subset));
                    sink.record(&SubsetReport {
                        index: range.start + tally.iterations - 1,
                        elements: subset.to_vec(),
                        bits: engine.sums().clone(),
                        low: verdict.window.low,
                        high: verdict.window.high,
                        passed: verdict.passed,
                        trace,
                    })?;
                }

                let keep_going = tracker.record_batch(1);

                if self.config.checkpoint_every > 0
                    && tally.iterations % self.config.checkpoint_every == 0
                    && let Some(store) = store.as_deref_mut()
                {
                    store.save(&Checkpoint::new(&self.config, &tally))?;
                    debug!(iteration = %format_int(tally.iterations), "Checkpoint saved");
                }

                if self.config.progress_every > 0
                    && tally.iterations % self.config.progress_every == 0
                {
                    log_progress(&tracker, range.count, started);
                }

                if !keep_going || !enumerator.advance() {
                    break;
                }
            }
        }

        if let Some(store) = store.as_deref_mut() {
            store.save(&Checkpoint::new(&self.config, &tally))?;
        }

        let full_sweep = self.config.slice.is_none();
        let (expected, precision_mismatch, count_mismatch) = if full_sweep {
            let expected = expected_total(max_value, subset_size);
            let mismatch = expected.mismatch();
            if let Some(mismatch) = &mismatch {
                warn!(%mismatch, "Floating-point total disagrees with exact count");
            }
            let count_mismatch = u128::from(tally.total()) != expected.exact;
            if count_mismatch {
                warn!(
                    tallied = %format_int(tally.total()),
                    expected = %format_int(expected.exact),
                    "Tallied subsets differ from the expected total"
                );
            }
            (Some(expected), mismatch, count_mismatch)
        } else {
            (None, None, false)
        };

        let elapsed = started.elapsed();
        info!(
            pass = %format_int(tally.pass),
            fail = %format_int(tally.fail),
            elapsed = %format_duration(elapsed.as_secs_f32()),
            "Sweep complete"
        );

        Ok(RunSummary {
            tally,
            range,
            full_sweep,
            expected,
            precision_mismatch,
            count_mismatch,
            resumed_at,
            elapsed,
        })
    }

    /// Split the range into slices and evaluate them on a worker pool.
    pub fn run_parallel(&self) -> Result<RunSummary, SubsetSumError> {
        let started = Instant::now();
        let range = self.range()?;
        let workers = self.config.workers.max(1);
        let parts = self.config.parallel_slices.unwrap_or(workers);
        let slices = plan_slices(range, parts);

        info!(
            workers,
            slices = slices.len(),
            count = %format_int(range.count),
            "Starting parallel sweep"
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|err| SubsetSumError::WorkerPool(err.to_string()))?;

        let (max_value, subset_size, strategy) = (
            self.config.max_value,
            self.config.subset_size,
            self.config.strategy,
        );
        let tallies: Vec<Tally> = pool.install(|| {
            slices
                .par_iter()
                .map(|slice| evaluate_slice(max_value, subset_size, strategy, *slice))
                .collect()
        });

        let mut tally = Tally::default();
        for part in &tallies {
            tally.merge(part);
        }

        let full_sweep = self.config.slice.is_none();
        let expected = full_sweep.then(|| expected_total(max_value, subset_size));
        let precision_mismatch = expected.as_ref().and_then(ExpectedTotal::mismatch);
        let count_mismatch = expected
            .as_ref()
            .is_some_and(|expected| u128::from(tally.total()) != expected.exact);
        if count_mismatch {
            warn!(
                tallied = %format_int(tally.total()),
                "Tallied subsets differ from the expected total"
            );
        }

        let elapsed = started.elapsed();
        info!(
            pass = %format_int(tally.pass),
            fail = %format_int(tally.fail),
            elapsed = %format_duration(elapsed.as_secs_f32()),
            "Parallel sweep complete"
        );

        Ok(RunSummary {
            tally,
            range,
            full_sweep,
            expected,
            precision_mismatch,
            count_mismatch,
            resumed_at: None,
            elapsed,
        })
    }
}

/// Evaluate one slice with its own engine. The slice is clamped to the end
/// of the enumeration.
pub fn evaluate_slice(
    max_value: u32,
    subset_size: usize,
    strategy: SuccessorStrategy,
    slice: Slice,
) -> Tally {
    let mut tally = Tally::default();
    if slice.count == 0 {
        return tally;
    }
    let mut enumerator =
        SubsetEnumerator::starting_at(max_value, subset_size, u128::from(slice.start), strategy);
    let mut engine = SumsetEngine::new(max_value, subset_size);
    while let Some(subset) = enumerator.current() {
        tally.record(check_subset(&mut engine, subset).passed);
        if tally.iterations >= slice.count || !enumerator.advance() {
            break;
        }
    }
    tally
}

fn log_progress(tracker: &ProgressTracker, count: u64, started: Instant) {
    let elapsed_secs = started.elapsed().as_secs_f32();
    let enumerated = tracker.processed_since_start();
    let processed = tracker.processed();
    let percent = if count > 0 {
        processed as f64 * 100.0 / count as f64
    } else {
        100.0
    };
    let eta = match tracker.remaining() {
        Some(remaining) if enumerated > 0 => {
            format_duration(elapsed_secs * remaining as f32 / enumerated as f32)
        }
        _ => "unknown".to_string(),
    };
    info!(
        processed = %format_int(processed),
        enumerated = %format_int(enumerated),
        percent = %format!("{percent:.2}"),
        eta = %eta,
        elapsed = %format_duration(elapsed_secs),
        "Sweep progress"
    );
}
