//! Schema normalization.
//!
//! A [`Normalizer`] binds one dataset spec to the canonical schema and turns
//! raw records into canonical ones. It holds no mutable state: the same input
//! always yields the same output.

mod action;
mod errors;
mod image;
mod resample;

pub use errors::NormalizeError;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::schema::{CanonicalSchema, DatasetSpec, ModalitySpec, ObservationKind, ObservationRule};
use crate::tensor::{self, DType, Tensor, TensorData};
use crate::trajectory::{CanonicalStep, Episode, RawEpisode, RawStep};

#[derive(Debug, Clone)]
pub struct Normalizer {
    canonical: Arc<CanonicalSchema>,
    spec: Arc<DatasetSpec>,
    dataset_id: Arc<str>,
}

impl Normalizer {
    /// Checks that every rule in `spec` lands on a compatible canonical
    /// modality and that the action remap fits the canonical width.
    pub fn new(canonical: Arc<CanonicalSchema>, spec: Arc<DatasetSpec>) -> Result<Self, NormalizeError> {
        let config_err = |reason: String| NormalizeError::Configuration {
            dataset: spec.id.clone(),
            reason,
        };

        canonical.validate().map_err(config_err)?;
        spec.validate().map_err(config_err)?;

        for rule in &spec.observations {
            let modality = canonical.observations.get(&rule.target).ok_or_else(|| {
                config_err(format!("unknown canonical observation '{}'", rule.target))
            })?;
            match (&rule.kind, modality.shape.len()) {
                (ObservationKind::Image { .. }, 3)
                    if image::SUPPORTED_CHANNELS.contains(&modality.shape[2]) => {}
                (ObservationKind::State { .. }, 1) if modality.dtype == DType::F32 => {}
                (kind, _) => {
                    return Err(config_err(format!(
                        "rule for '{}' ({kind:?}) does not fit modality {:?}",
                        rule.target, modality
                    )));
                }
            }
        }

        let width = spec.action.width();
        if width > canonical.action_dim {
            return Err(config_err(format!(
                "action remap writes {width} dimensions, canonical width is {}",
                canonical.action_dim
            )));
        }

        Ok(Self {
            dataset_id: Arc::from(spec.id.as_str()),
            canonical,
            spec,
        })
    }

    pub fn dataset_id(&self) -> &Arc<str> {
        &self.dataset_id
    }

    pub fn spec(&self) -> &DatasetSpec {
        &self.spec
    }

    pub fn canonical(&self) -> &CanonicalSchema {
        &self.canonical
    }

    /// Normalizes a single step. Episode position fields (`index`,
    /// `is_first`, `is_last`) are left for [`normalize_episode`] to assign.
    ///
    /// [`normalize_episode`]: Normalizer::normalize_episode
    pub fn normalize(&self, raw: &RawStep) -> Result<CanonicalStep, NormalizeError> {
        let mut observation = BTreeMap::new();
        let mut observation_mask = BTreeMap::new();
        for (key, modality) in &self.canonical.observations {
            let rule = self.spec.observations.iter().find(|r| &r.target == key);
            let value = match rule {
                Some(rule) => self.observation(rule, modality, raw)?,
                None => None,
            };
            observation_mask.insert(key.clone(), value.is_some());
            observation.insert(
                key.clone(),
                value.unwrap_or_else(|| Tensor::zeros(&modality.shape, modality.dtype)),
            );
        }

        let (mut action, action_mask) =
            action::remap(&self.spec.action, &raw.action, self.canonical.action_dim)
                .map_err(|(field, reason)| self.mismatch(field, reason))?;
        if let Some(bounds) = &self.canonical.action_bounds {
            action::clip(&mut action, &action_mask, bounds);
        }

        if let Some(reward) = raw.reward {
            if !reward.is_finite() {
                return Err(self.mismatch("reward", "non-finite reward"));
            }
        }

        Ok(CanonicalStep {
            index: 0,
            observation,
            observation_mask,
            action,
            action_mask,
            reward: raw.reward,
            is_first: false,
            is_last: false,
            is_terminal: raw.is_terminal,
        })
    }

    /// Normalizes a whole episode: per-step normalization, alignment to the
    /// canonical control rate, length bounds, and episode flags.
    pub fn normalize_episode(&self, raw: &RawEpisode) -> Result<Episode, NormalizeError> {
        if raw.is_empty() {
            return Err(NormalizeError::EmptyEpisode {
                dataset: self.spec.id.clone(),
                episode_id: raw.episode_id.clone(),
            });
        }

        let stamps: Vec<Option<f64>> = raw.steps.iter().map(|s| s.timestamp).collect();
        let times = resample::step_times(&stamps, self.spec.control_frequency).map_err(
            |(i, reason)| {
                self.mismatch(
                    "timestamp",
                    format!("episode '{}': step {i}: {reason}", raw.episode_id),
                )
            },
        )?;
        // One tick past the maximum is enough to detect truncation.
        let limit = self.spec.episode_length.max.map(|max| max.saturating_add(1));
        let mut picked =
            resample::nearest_indices(&times, self.canonical.control_frequency, limit);

        let mut truncated = false;
        if let Some(max) = self.spec.episode_length.max {
            if picked.len() > max {
                warn!(
                    dataset = %self.dataset_id,
                    episode = %raw.episode_id,
                    native_steps = raw.len(),
                    max,
                    "truncating episode to maximum length"
                );
                picked.truncate(max);
                truncated = true;
            }
        }
        if let Some(min) = self.spec.episode_length.min {
            if picked.len() < min {
                return Err(NormalizeError::EpisodeTooShort {
                    dataset: self.spec.id.clone(),
                    episode_id: raw.episode_id.clone(),
                    len: picked.len(),
                    min,
                });
            }
        }

        let mut steps: Vec<CanonicalStep> = Vec::with_capacity(picked.len());
        let mut previous: Option<usize> = None;
        for &source in &picked {
            let step = match (previous, steps.last()) {
                // Upsampling repeats a native step; reuse its normalized form.
                // The reward was earned once, so repeats carry none.
                (Some(prev), Some(last)) if prev == source => CanonicalStep {
                    reward: None,
                    ..last.clone()
                },
                _ => self.normalize(&raw.steps[source])?,
            };
            steps.push(step);
            previous = Some(source);
        }

        let terminal = !truncated && raw.steps.last().is_some_and(|s| s.is_terminal);
        let last = steps.len() - 1;
        for (i, step) in steps.iter_mut().enumerate() {
            step.index = i;
            step.is_first = i == 0;
            step.is_last = i == last;
            step.is_terminal = i == last && terminal;
        }

        Ok(Episode::new(
            self.dataset_id.clone(),
            raw.episode_id.clone(),
            steps,
        )?)
    }

    /// Returns `None` for an absent optional field.
    fn observation(
        &self,
        rule: &ObservationRule,
        modality: &ModalitySpec,
        raw: &RawStep,
    ) -> Result<Option<Tensor>, NormalizeError> {
        let field = format!("observation.{}", rule.source);
        let Some(value) = raw.observation.get(&rule.source) else {
            if rule.required {
                return Err(self.mismatch(field, "missing required observation"));
            }
            return Ok(None);
        };
        match tensor::checked_numel(&value.shape) {
            None => return Err(self.mismatch(field, "shape overflows")),
            Some(n) if n != value.numel() => {
                return Err(self.mismatch(field, "element count does not match shape"));
            }
            Some(_) => {}
        }

        match rule.kind {
            ObservationKind::Image {
                resize,
                flip_vertical,
            } => {
                let (h, w, c) = (modality.shape[0], modality.shape[1], modality.shape[2]);
                if value.shape.len() != 3 || value.shape.contains(&0) {
                    return Err(self.mismatch(
                        field,
                        format!("expected a non-empty [H, W, C] image, found shape {:?}", value.shape),
                    ));
                }
                if value.shape[2] != c {
                    return Err(self.mismatch(
                        field,
                        format!("expected {c} channels, found {}", value.shape[2]),
                    ));
                }
                if value.dtype() != modality.dtype {
                    return Err(self.mismatch(
                        field,
                        format!("expected dtype {:?}, found {:?}", modality.dtype, value.dtype()),
                    ));
                }
                image::transform(value, h, w, resize, flip_vertical)
                    .map(Some)
                    .map_err(|reason| self.mismatch(field, reason))
            }
            ObservationKind::State { pad, truncate } => {
                let width = modality.shape[0];
                let mut values: Vec<f32> = match &value.data {
                    TensorData::F32(v) => v.clone(),
                    TensorData::U8(v) => v.iter().map(|&x| x as f32).collect(),
                };
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(self.mismatch(field, "non-finite state value"));
                }
                if values.len() < width && !pad {
                    return Err(self.mismatch(
                        field,
                        format!("expected {width} values, found {}", values.len()),
                    ));
                }
                if values.len() > width && !truncate {
                    return Err(self.mismatch(
                        field,
                        format!("expected at most {width} values, found {}", values.len()),
                    ));
                }
                values.resize(width, 0.0);
                Ok(Some(Tensor::vector(values)))
            }
        }
    }

    fn mismatch(&self, field: impl Into<String>, reason: impl Into<String>) -> NormalizeError {
        NormalizeError::SchemaMismatch {
            dataset: self.spec.id.clone(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}
