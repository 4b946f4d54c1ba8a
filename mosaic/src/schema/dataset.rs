use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_scale() -> f32 {
    1.0
}

/// Declarative description of one dataset: where it lives and how its raw
/// records map onto the canonical schema.
///
/// Adding a dataset never requires code, only a new `DatasetSpec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Unique dataset identifier. May be omitted in configuration tables,
    /// where the table key supplies it.
    #[serde(default)]
    pub id: String,
    /// Storage location understood by the episode source layer.
    pub source: String,
    /// Native control rate in Hz.
    pub control_frequency: f64,
    /// Observation key remapping rules.
    #[serde(default)]
    pub observations: Vec<ObservationRule>,
    /// How raw actions become a canonical action vector.
    pub action: ActionRemap,
    #[serde(default)]
    pub episode_length: EpisodeBounds,
}

/// Maps one raw observation field onto one canonical modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRule {
    /// Key in the raw step's observation map.
    pub source: String,
    /// Canonical modality key.
    pub target: String,
    /// Missing required fields are a schema mismatch; missing optional ones
    /// are zero-filled and masked out.
    #[serde(default = "default_true")]
    pub required: bool,
    pub kind: ObservationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObservationKind {
    /// `[H, W, C]` image resized to the canonical shape.
    Image {
        #[serde(default)]
        resize: ResizeMethod,
        #[serde(default)]
        flip_vertical: bool,
    },
    /// 1-D vector fitted into the canonical width.
    State {
        #[serde(default = "default_true")]
        pad: bool,
        #[serde(default)]
        truncate: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMethod {
    #[default]
    Nearest,
    Bilinear,
}

/// One canonical action dimension taken from a raw action field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSource {
    pub key: String,
    pub index: usize,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub offset: f32,
}

impl ActionSource {
    pub fn new(key: impl Into<String>, index: usize) -> Self {
        Self {
            key: key.into(),
            index,
            scale: 1.0,
            offset: 0.0,
        }
    }
}

/// Fixed transform from raw action fields to the canonical action vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRemap {
    /// Per canonical dimension: a raw source, or `null` to zero-fill.
    /// Dimensions past the end of `dims` are zero-filled too.
    Select { dims: Vec<Option<ActionSource>> },
    /// `out = matrix * raw[key] + bias`, one matrix row per canonical dimension.
    Linear {
        key: String,
        matrix: Vec<Vec<f32>>,
        #[serde(default)]
        bias: Vec<f32>,
    },
}

impl ActionRemap {
    /// Identity selection of the first `n` entries of `key`.
    pub fn prefix(key: impl Into<String>, n: usize) -> Self {
        let key = key.into();
        ActionRemap::Select {
            dims: (0..n).map(|i| Some(ActionSource::new(key.clone(), i))).collect(),
        }
    }

    /// Number of canonical dimensions this remap writes.
    pub fn width(&self) -> usize {
        match self {
            ActionRemap::Select { dims } => dims.len(),
            ActionRemap::Linear { matrix, .. } => matrix.len(),
        }
    }
}

/// Accepted episode lengths, measured after frequency alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeBounds {
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
}

impl DatasetSpec {
    /// Checks the spec is self-consistent. Compatibility with a canonical
    /// schema is checked separately when a normalizer is built.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("dataset id must be non-empty".to_string());
        }
        if !self.control_frequency.is_finite() || self.control_frequency <= 0.0 {
            return Err(format!(
                "control_frequency must be positive, got {}",
                self.control_frequency
            ));
        }

        let mut targets = BTreeSet::new();
        for rule in &self.observations {
            if rule.source.is_empty() || rule.target.is_empty() {
                return Err("observation rules need both source and target keys".to_string());
            }
            if !targets.insert(rule.target.as_str()) {
                return Err(format!("observation target '{}' is mapped twice", rule.target));
            }
        }

        match &self.action {
            ActionRemap::Select { dims } => {
                for dim in dims.iter().flatten() {
                    if !dim.scale.is_finite() || !dim.offset.is_finite() {
                        return Err(format!("non-finite scale/offset for action key '{}'", dim.key));
                    }
                }
            }
            ActionRemap::Linear { matrix, bias, .. } => {
                let cols = matrix.first().map(Vec::len).unwrap_or(0);
                if matrix.is_empty() || cols == 0 {
                    return Err("linear action remap needs a non-empty matrix".to_string());
                }
                if matrix.iter().any(|row| row.len() != cols) {
                    return Err("linear action remap rows differ in length".to_string());
                }
                if !bias.is_empty() && bias.len() != matrix.len() {
                    return Err(format!(
                        "linear action bias has {} entries for {} rows",
                        bias.len(),
                        matrix.len()
                    ));
                }
            }
        }

        let EpisodeBounds { min, max } = self.episode_length;
        if min == Some(0) {
            return Err("episode_length.min must be at least 1".to_string());
        }
        if max == Some(0) {
            return Err("episode_length.max must be at least 1".to_string());
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(format!("episode_length.min {lo} exceeds max {hi}"));
            }
        }
        Ok(())
    }
}
