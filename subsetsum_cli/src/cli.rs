use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use subsetsum_rs::combinator::{Slice, SuccessorStrategy};
use subsetsum_rs::config::{Config, ReportMode};

#[derive(Parser, Debug)]
#[command(
    name = "subsetsum",
    version,
    about = "Checks that N-subsets of {1..M} reach every sum between M and their total minus M"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate every subset, or a slice of the enumeration
    #[command(name = "sweep")]
    Sweep(SweepArgs),
    /// Print slice boundaries for splitting a sweep across machines
    #[command(name = "plan")]
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
pub struct SweepArgs {
    /// The maximum value allowed in the sets
    #[arg(value_name = "M")]
    pub max_value: u32,

    /// The number of elements in a set
    #[arg(value_name = "N")]
    pub subset_size: usize,

    /// Start at the i-th generated subset (requires COUNT)
    #[arg(value_name = "START", requires = "count")]
    pub start: Option<u64>,

    /// Only test COUNT subsets, beginning at START
    #[arg(value_name = "COUNT")]
    pub count: Option<u64>,

    /// Successor algorithm used to step through the enumeration
    #[arg(long, value_enum, default_value = "positional")]
    pub strategy: StrategyValue,

    /// Which per-subset lines to print.
    ///
    /// Defaults to `all` for a single worker and `off` when `--workers` or
    /// `--slices` asks for the parallel mode, which cannot print per-subset lines.
    #[arg(long, value_enum)]
    pub report: Option<ReportValue>,

    /// Highlight the tested window in green and missing sums in red
    #[arg(long, default_value_t = false)]
    pub color: bool,

    /// Print the shift/OR steps that build each subset's sums.
    ///
    /// Implies `--report all` when reporting is off.
    #[arg(long = "show-calculation", default_value_t = false)]
    pub show_calculation: bool,

    /// JSON file to resume from and to save progress into (single worker only)
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub checkpoint: Option<PathBuf>,

    /// Save a checkpoint every this many subsets (0 = only at the end)
    #[arg(long = "checkpoint-every", default_value_t = 10_000_000)]
    pub checkpoint_every: u64,

    /// Log progress every this many subsets (0 disables progress logs)
    #[arg(long = "progress-every", default_value_t = 1_000_000)]
    pub progress_every: u64,

    /// Worker threads; more than one splits the range into parallel slices
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Number of slices for the parallel mode (defaults to one per worker)
    #[arg(long)]
    pub slices: Option<usize>,

    /// Also write logs to this file
    #[arg(long = "log-file", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Print start time, end time and running time
    #[arg(long, default_value_t = false)]
    pub timestamps: bool,

    /// Reduce log noise (no progress lines or run banners)
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

impl SweepArgs {
    pub fn into_config(self) -> Config {
        let parallel = self.workers > 1 || self.slices.is_some_and(|slices| slices > 1);
        let mut report = match self.report {
            Some(value) => value.to_mode(),
            None if parallel => ReportMode::Off,
            None => ReportMode::All,
        };
        if self.show_calculation && report == ReportMode::Off {
            report = ReportMode::All;
        }
        let slice = match (self.start, self.count) {
            (Some(start), Some(count)) => Some(Slice::new(start, count)),
            _ => None,
        };
        Config {
            max_value: self.max_value,
            subset_size: self.subset_size,
            slice,
            strategy: self.strategy.to_strategy(),
            report,
            trace: self.show_calculation,
            checkpoint_every: self.checkpoint_every,
            progress_every: if self.quiet { 0 } else { self.progress_every },
            workers: self.workers.max(1),
            parallel_slices: self.slices,
            quiet: self.quiet,
            checkpoint: self.checkpoint,
        }
    }
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    #[arg(value_name = "M")]
    pub max_value: u32,

    #[arg(value_name = "N")]
    pub subset_size: usize,

    /// Number of slices to split the enumeration into
    #[arg(long, default_value_t = 1)]
    pub slices: usize,

    /// Emit the plan as JSON instead of one `M N START COUNT` line per slice
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyValue {
    Positional,
    Bubble,
}

impl StrategyValue {
    fn to_strategy(self) -> SuccessorStrategy {
        match self {
            StrategyValue::Positional => SuccessorStrategy::Positional,
            StrategyValue::Bubble => SuccessorStrategy::Bubble,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportValue {
    Off,
    All,
    #[value(name = "failures", alias = "false-only")]
    Failures,
}

impl ReportValue {
    fn to_mode(self) -> ReportMode {
        match self {
            ReportValue::Off => ReportMode::Off,
            ReportValue::All => ReportMode::All,
            ReportValue::Failures => ReportMode::Failures,
        }
    }
}
