use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::EpisodeError;
use crate::tensor::Tensor;

/// One timestep as a dataset stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(default)]
    pub observation: BTreeMap<String, Tensor>,
    #[serde(default)]
    pub action: BTreeMap<String, Vec<f32>>,
    #[serde(default)]
    pub reward: Option<f32>,
    #[serde(default)]
    pub is_terminal: bool,
    /// Seconds since episode start, when the dataset records it.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl RawStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observation(mut self, key: impl Into<String>, value: Tensor) -> Self {
        self.observation.insert(key.into(), value);
        self
    }

    pub fn with_action(mut self, key: impl Into<String>, value: Vec<f32>) -> Self {
        self.action.insert(key.into(), value);
        self
    }

    pub fn with_reward(mut self, reward: f32) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn terminal(mut self) -> Self {
        self.is_terminal = true;
        self
    }

    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A demonstration as read from storage, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEpisode {
    pub episode_id: String,
    pub steps: Vec<RawStep>,
}

impl RawEpisode {
    pub fn new(episode_id: impl Into<String>, steps: Vec<RawStep>) -> Self {
        Self {
            episode_id: episode_id.into(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A timestep in the canonical schema. Field names, shapes and dtypes are
/// identical for every dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStep {
    pub index: usize,
    pub observation: BTreeMap<String, Tensor>,
    /// False for modalities the source dataset does not provide (zero-filled).
    pub observation_mask: BTreeMap<String, bool>,
    pub action: Vec<f32>,
    /// False for action dimensions the source dataset does not provide.
    pub action_mask: Vec<bool>,
    pub reward: Option<f32>,
    pub is_first: bool,
    pub is_last: bool,
    pub is_terminal: bool,
}

/// A normalized demonstration.
///
/// `is_first` holds only at index 0, `is_last` only at the final index, and
/// step indices run `0..len` without gaps. [`Episode::new`] enforces this.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    dataset_id: Arc<str>,
    episode_id: String,
    steps: Vec<CanonicalStep>,
}

impl Episode {
    pub fn new(
        dataset_id: Arc<str>,
        episode_id: impl Into<String>,
        steps: Vec<CanonicalStep>,
    ) -> Result<Self, EpisodeError> {
        let episode_id = episode_id.into();
        if steps.is_empty() {
            return Err(EpisodeError::Empty { episode_id });
        }
        let last = steps.len() - 1;
        for (i, step) in steps.iter().enumerate() {
            if step.index != i {
                return Err(EpisodeError::IndexGap {
                    episode_id,
                    expected: i,
                    found: step.index,
                });
            }
            if step.is_first != (i == 0) {
                return Err(EpisodeError::MisplacedFlag {
                    episode_id,
                    flag: "is_first",
                    index: i,
                });
            }
            if step.is_last != (i == last) {
                return Err(EpisodeError::MisplacedFlag {
                    episode_id,
                    flag: "is_last",
                    index: i,
                });
            }
        }
        Ok(Self {
            dataset_id,
            episode_id,
            steps,
        })
    }

    pub fn dataset_id(&self) -> &Arc<str> {
        &self.dataset_id
    }

    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }

    pub fn steps(&self) -> &[CanonicalStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    // Never true for a constructed episode; kept for the usual len/is_empty pair.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
