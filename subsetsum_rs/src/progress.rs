use serde::{Deserialize, Serialize};

/// Pass/fail counters for a run or slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub pass: u64,
    pub fail: u64,
    /// Subsets evaluated so far, counted from the start of the range.
    pub iterations: u64,
}

impl Tally {
    pub fn record(&mut self, passed: bool) {
        if passed {
            self.pass += 1;
        } else {
            self.fail += 1;
        }
        self.iterations += 1;
    }

    /// Add the counters of a disjoint range.
    pub fn merge(&mut self, other: &Tally) {
        self.pass += other.pass;
        self.fail += other.fail;
        self.iterations += other.iterations;
    }

    pub fn total(&self) -> u64 {
        self.pass + self.fail
    }

    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.pass as f64 / self.total() as f64
    }
}

#[derive(Debug)]
pub struct ProgressTracker {
    processed: u64,
    limit: Option<u64>,
    start_offset: u64,
}

impl ProgressTracker {
    /// `start_offset` is the number of subsets already processed (e.g.
    /// restored from a checkpoint); `limit` caps the total.
    pub fn new(start_offset: u64, limit: Option<u64>) -> Self {
        Self {
            processed: start_offset,
            limit,
            start_offset,
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    pub fn processed_since_start(&self) -> u64 {
        self.processed.saturating_sub(self.start_offset)
    }

    pub fn has_remaining(&self) -> bool {
        self.limit.is_none_or(|limit| self.processed < limit)
    }

    /// Subsets left before the limit, if there is one.
    pub fn remaining(&self) -> Option<u64> {
        self.limit
            .map(|limit| limit.saturating_sub(self.processed))
    }

    pub fn record_batch(&mut self, batch_size: u64) -> bool {
        self.processed += batch_size;
        self.has_remaining()
    }
}
