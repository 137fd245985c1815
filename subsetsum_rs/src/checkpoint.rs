use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::combinator::Slice;
use crate::config::Config;
use crate::error::SubsetSumError;
use crate::progress::Tally;

/// Resumable run state. The enumerator position is rebuilt from
/// `range.start + iteration` by unranking, so nothing else is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub max_value: u32,
    pub subset_size: usize,
    /// The slice being processed, None for a full sweep.
    pub range: Option<Slice>,
    pub iteration: u64,
    pub pass: u64,
    pub fail: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(config: &Config, tally: &Tally) -> Self {
        Self {
            max_value: config.max_value,
            subset_size: config.subset_size,
            range: config.slice,
            iteration: tally.iterations,
            pass: tally.pass,
            fail: tally.fail,
            updated_at: Utc::now(),
        }
    }

    pub fn tally(&self) -> Tally {
        Tally {
            pass: self.pass,
            fail: self.fail,
            iterations: self.iteration,
        }
    }

    fn describe(&self) -> String {
        let mut described = Config::new(self.max_value, self.subset_size);
        described.slice = self.range;
        described.describe_run()
    }

    /// Reject checkpoints written for different run parameters.
    pub fn ensure_matches(&self, config: &Config) -> Result<(), SubsetSumError> {
        let same = self.max_value == config.max_value
            && self.subset_size == config.subset_size
            && self.range == config.slice;
        if same {
            Ok(())
        } else {
            Err(SubsetSumError::CheckpointMismatch {
                expected: config.describe_run(),
                found: self.describe(),
            })
        }
    }
}

pub trait CheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), SubsetSumError>;
    fn load(&self) -> Result<Option<Checkpoint>, SubsetSumError>;
}

/// Stores the checkpoint as pretty JSON. Writes go to a sibling temp file
/// that is renamed over the target, so a crash never leaves a torn file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SubsetSumError {
        SubsetSumError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CheckpointStore for JsonFileStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), SubsetSumError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let payload =
            serde_json::to_vec_pretty(checkpoint).map_err(|source| SubsetSumError::Json {
                path: self.path.clone(),
                source,
            })?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload).map_err(|err| self.io_error(err))?;
        fs::rename(&tmp_path, &self.path).map_err(|err| self.io_error(err))
    }

    fn load(&self) -> Result<Option<Checkpoint>, SubsetSumError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path).map_err(|err| self.io_error(err))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| SubsetSumError::Json {
                path: self.path.clone(),
                source,
            })
    }
}

/// In-memory store, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<Checkpoint>,
    saves: usize,
}

impl MemoryStore {
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            saved: Some(checkpoint),
            saves: 0,
        }
    }

    pub fn saved(&self) -> Option<&Checkpoint> {
        self.saved.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl CheckpointStore for MemoryStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), SubsetSumError> {
        self.saved = Some(checkpoint.clone());
        self.saves += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<Checkpoint>, SubsetSumError> {
        Ok(self.saved.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_checkpoint() -> Checkpoint {
        let config = Config::new(12, 5).with_slice(100, 50);
        Checkpoint::new(
            &config,
            &Tally {
                pass: 30,
                fail: 2,
                iterations: 32,
            },
        )
    }

    #[test]
    fn json_store_roundtrips_through_disk() {
        let dir = tempdir().expect("temp dir");
        let mut store = JsonFileStore::new(dir.path().join("nested").join("state.json"));
        assert!(store.load().expect("load").is_none());

        let checkpoint = sample_checkpoint();
        store.save(&checkpoint).expect("save");
        assert_eq!(store.load().expect("load"), Some(checkpoint));
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn json_store_reports_corrupt_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("state.json");
        fs::write(&path, b"{ not json").expect("write");
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(SubsetSumError::Json { .. })));
    }

    #[test]
    fn checkpoint_rejects_other_parameters() {
        let checkpoint = sample_checkpoint();
        assert!(
            checkpoint
                .ensure_matches(&Config::new(12, 5).with_slice(100, 50))
                .is_ok()
        );

        let err = checkpoint
            .ensure_matches(&Config::new(12, 5))
            .expect_err("full sweep differs from slice");
        assert!(err.is_usage());
        assert!(err.to_string().contains("slice 100+50"));
    }

    #[test]
    fn memory_store_counts_saves() {
        let mut store = MemoryStore::default();
        store.save(&sample_checkpoint()).expect("save");
        store.save(&sample_checkpoint()).expect("save");
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.saved().map(|c| c.iteration), Some(32));
    }
}
