mod canonical;
mod dataset;

pub use canonical::{ActionBounds, CanonicalSchema, ModalitySpec};
pub use dataset::{
    ActionRemap, ActionSource, DatasetSpec, EpisodeBounds, ObservationKind, ObservationRule,
    ResizeMethod,
};
