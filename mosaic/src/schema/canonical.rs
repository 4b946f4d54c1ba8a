use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tensor::DType;

/// Layout of one canonical observation modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalitySpec {
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl ModalitySpec {
    pub fn image(height: usize, width: usize, channels: usize) -> Self {
        Self {
            shape: vec![height, width, channels],
            dtype: DType::U8,
        }
    }

    pub fn state(width: usize) -> Self {
        Self {
            shape: vec![width],
            dtype: DType::F32,
        }
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionBounds {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

/// The single layout every dataset is normalized into.
///
/// `action_dim` and `action_bounds` are also what an evaluation harness
/// needs to emit actions in the training-time schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSchema {
    /// Target control rate in Hz.
    pub control_frequency: f64,
    pub action_dim: usize,
    #[serde(default)]
    pub action_bounds: Option<ActionBounds>,
    #[serde(default)]
    pub observations: BTreeMap<String, ModalitySpec>,
}

impl CanonicalSchema {
    pub fn new(control_frequency: f64, action_dim: usize) -> Self {
        Self {
            control_frequency,
            action_dim,
            action_bounds: None,
            observations: BTreeMap::new(),
        }
    }

    pub fn with_observation(mut self, key: impl Into<String>, modality: ModalitySpec) -> Self {
        self.observations.insert(key.into(), modality);
        self
    }

    pub fn with_action_bounds(mut self, low: Vec<f32>, high: Vec<f32>) -> Self {
        self.action_bounds = Some(ActionBounds { low, high });
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.control_frequency.is_finite() || self.control_frequency <= 0.0 {
            return Err(format!(
                "canonical control_frequency must be positive, got {}",
                self.control_frequency
            ));
        }
        if self.action_dim == 0 {
            return Err("canonical action_dim must be positive".to_string());
        }
        if let Some(bounds) = &self.action_bounds {
            if bounds.low.len() != self.action_dim || bounds.high.len() != self.action_dim {
                return Err(format!(
                    "action_bounds must have {} entries per side",
                    self.action_dim
                ));
            }
            if bounds.low.iter().zip(&bounds.high).any(|(lo, hi)| lo > hi) {
                return Err("action_bounds low exceeds high".to_string());
            }
        }
        for (key, modality) in &self.observations {
            if modality.shape.is_empty() || modality.shape.contains(&0) {
                return Err(format!("modality '{key}' has an empty shape"));
            }
            match (modality.shape.len(), modality.dtype) {
                (1, DType::F32) | (3, _) => {}
                (rank, dtype) => {
                    return Err(format!(
                        "modality '{key}' must be a rank-1 f32 state or a rank-3 image, got rank {rank} {dtype:?}"
                    ));
                }
            }
        }
        Ok(())
    }
}
