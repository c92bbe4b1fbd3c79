use crate::algorithms::implicit::ImplicitBuckets;
use crate::algorithms::parameters::ParameterSnapshot;
use crate::algorithms::Hyperparameters;
use crate::error::{ModelError, Result};
use crate::models::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

const CHECKPOINT_EXTENSION: &str = "json";

/// Versioned snapshot of a latent factor model's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub hyperparameters: Hyperparameters,
    pub completed_epochs: usize,
    pub rating_average: f64,
    pub parameters: ParameterSnapshot,
    pub implicit_buckets: Option<BTreeMap<UserId, ImplicitBuckets>>,
}

#[derive(Deserialize)]
struct CheckpointHeader {
    format_version: u32,
}

impl Checkpoint {
    pub fn new(
        hyperparameters: Hyperparameters,
        completed_epochs: usize,
        rating_average: f64,
        parameters: ParameterSnapshot,
        implicit_buckets: Option<BTreeMap<UserId, ImplicitBuckets>>,
    ) -> Self {
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            saved_at: Utc::now(),
            hyperparameters,
            completed_epochs,
            rating_average,
            parameters,
            implicit_buckets,
        }
    }

    pub fn key(&self) -> String {
        self.hyperparameters.checkpoint_key(self.completed_epochs)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a checkpoint, rejecting format versions this build does not
    /// understand before looking at the rest of the document.
    pub fn from_json(json: &str) -> Result<Self> {
        let header: CheckpointHeader = serde_json::from_str(json)?;
        if header.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(ModelError::UnsupportedCheckpointVersion(header.format_version));
        }
        Ok(serde_json::from_str(json)?)
    }
}

/// Durable home for checkpoints, addressed by key.
pub trait CheckpointStore {
    fn save(&mut self, key: &str, checkpoint: &Checkpoint) -> Result<()>;
    fn load(&self, key: &str) -> Result<Checkpoint>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// Writes each checkpoint to `<directory>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    directory: PathBuf,
}

impl FileCheckpointStore {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", key, CHECKPOINT_EXTENSION))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, key: &str, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.path_for(key);
        let mut writer = BufWriter::new(fs::File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, checkpoint)?;
        writer.flush()?;
        debug!("Wrote checkpoint {:?}", path);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Checkpoint> {
        let path = self.path_for(key);
        if !path.exists() {
            return Err(ModelError::CheckpointNotFound(key.to_string()));
        }
        let json = fs::read_to_string(&path)?;
        Checkpoint::from_json(&json)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(CHECKPOINT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Keeps serialized checkpoints in memory. Goes through the same JSON
/// encoding as the file store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: BTreeMap<String, String>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&mut self, key: &str, checkpoint: &Checkpoint) -> Result<()> {
        self.checkpoints.insert(key.to_string(), checkpoint.to_json()?);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Checkpoint> {
        let json = self
            .checkpoints
            .get(key)
            .ok_or_else(|| ModelError::CheckpointNotFound(key.to_string()))?;
        Checkpoint::from_json(json)
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.checkpoints.keys().cloned().collect())
    }
}
