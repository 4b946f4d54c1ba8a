use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AssembleError;

/// Dataset id → non-negative sampling weight. A zero weight keeps a dataset
/// registered but never sampled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SamplingWeights(BTreeMap<String, f64>);

impl SamplingWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dataset weighted equally.
    pub fn uniform<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(|id| (id.into(), 1.0)).collect())
    }

    pub fn with(mut self, id: impl Into<String>, weight: f64) -> Self {
        self.0.insert(id.into(), weight);
        self
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(id, w)| (id.as_str(), *w))
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn validate(&self) -> Result<(), AssembleError> {
        for (id, weight) in &self.0 {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(AssembleError::Configuration(format!(
                    "weight for '{id}' must be finite and non-negative, got {weight}"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(AssembleError::Configuration(
                "sampling weights must sum to a positive value".to_string(),
            ));
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for SamplingWeights {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(id, w)| (id.into(), w)).collect())
    }
}
