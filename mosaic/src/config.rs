//! Pipeline configuration.
//!
//! One JSON document describes the whole data pipeline:
//!
//! ```json
//! {
//!   "canonical": { "control_frequency": 10.0, "action_dim": 3, "observations": {} },
//!   "datasets": {
//!     "lift": { "source": "lift.jsonl", "control_frequency": 20.0,
//!               "action": { "type": "select", "dims": [] } }
//!   },
//!   "window": { "length": 16, "stride": 8 },
//!   "assembler": { "batch_size": 4, "shard_count": 2, "shuffle_buffer_size": 8 },
//!   "weights": { "lift": 1.0 }
//! }
//! ```
//!
//! Relative source paths are resolved against the directory of the file the
//! configuration was loaded from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assemble::{AssemblerConfig, SamplingWeights};
use crate::runtime::RuntimeConfig;
use crate::schema::{CanonicalSchema, DatasetSpec};
use crate::source::HostShard;
use crate::stream::EmptyEpisodePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Window length `W` and stride `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub length: usize,
    pub stride: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length: 16,
            stride: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub canonical: CanonicalSchema,
    /// Dataset id → spec. The key fills in the spec's `id`.
    pub datasets: BTreeMap<String, DatasetSpec>,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub assembler: AssemblerConfig,
    /// Omitted or empty means every dataset weighted equally. Datasets missing
    /// from a non-empty table are never sampled.
    #[serde(default)]
    pub weights: SamplingWeights,
    #[serde(default)]
    pub on_empty_episode: EmptyEpisodePolicy,
    #[serde(default)]
    pub host_shard: HostShard,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(canonical: CanonicalSchema) -> Self {
        Self {
            canonical,
            datasets: BTreeMap::new(),
            window: WindowConfig::default(),
            assembler: AssemblerConfig::default(),
            weights: SamplingWeights::default(),
            on_empty_episode: EmptyEpisodePolicy::default(),
            host_shard: HostShard::default(),
            runtime: RuntimeConfig::default(),
            base_dir: None,
        }
    }

    pub fn with_dataset(mut self, id: impl Into<String>, spec: DatasetSpec) -> Self {
        self.datasets.insert(id.into(), spec);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&json)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Effective weights: uniform when the table is empty, otherwise the
    /// configured table with unlisted datasets weighted zero.
    pub fn effective_weights(&self) -> SamplingWeights {
        if self.weights.iter().next().is_none() {
            return SamplingWeights::uniform(self.datasets.keys().cloned());
        }
        let mut weights = self.weights.clone();
        for id in self.datasets.keys() {
            if weights.get(id).is_none() {
                weights = weights.with(id.clone(), 0.0);
            }
        }
        weights
    }

    /// Resolves a dataset source location. Paths relative to a loaded config
    /// file are joined to its directory; URIs are left alone.
    pub fn resolve_source(&self, location: &str) -> String {
        match &self.base_dir {
            Some(dir) if !location.contains("://") && Path::new(location).is_relative() => {
                dir.join(location).to_string_lossy().into_owned()
            }
            _ => location.to_string(),
        }
    }

    /// Checks the cross-section constraints that no single section can see.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datasets.is_empty() {
            return Err(ConfigError::Invalid("no datasets configured".to_string()));
        }
        for (id, _) in self.weights.iter() {
            if !self.datasets.contains_key(id) {
                return Err(ConfigError::Invalid(format!(
                    "weight given for unknown dataset '{id}'"
                )));
            }
        }
        HostShard::new(self.host_shard.index, self.host_shard.count)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.runtime.validate()
    }
}
