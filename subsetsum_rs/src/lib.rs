pub mod checkpoint;
pub mod combinator;
pub mod completeness;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod sumset;

pub use checkpoint::{Checkpoint, CheckpointStore, JsonFileStore, MemoryStore};
pub use combinator::{Slice, Subset, SubsetEnumerator, SuccessorStrategy};
pub use config::{Config, ReportMode};
pub use error::{PrecisionMismatch, SubsetSumError};
pub use pipeline::{RunSummary, SweepDriver};
pub use report::{CollectingSink, NullSink, ReportSink, SubsetReport};
pub use sumset::{SumsBitVector, SumsetEngine};
