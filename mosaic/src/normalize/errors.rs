use thiserror::Error;

use crate::trajectory::EpisodeError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// A raw record violates its declared spec. Fatal for the run.
    #[error("schema mismatch in dataset '{dataset}', field '{field}': {reason}")]
    SchemaMismatch {
        dataset: String,
        field: String,
        reason: String,
    },

    #[error("dataset '{dataset}': episode '{episode_id}' is empty")]
    EmptyEpisode { dataset: String, episode_id: String },

    #[error("dataset '{dataset}': episode '{episode_id}' has {len} steps, fewer than the minimum {min}")]
    EpisodeTooShort {
        dataset: String,
        episode_id: String,
        len: usize,
        min: usize,
    },

    /// The dataset spec cannot be mapped onto the canonical schema.
    #[error("dataset '{dataset}' is incompatible with the canonical schema: {reason}")]
    Configuration { dataset: String, reason: String },

    #[error(transparent)]
    Episode(#[from] EpisodeError),
}

impl NormalizeError {
    /// Errors the empty-episode policy may downgrade to a skip.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            NormalizeError::EmptyEpisode { .. } | NormalizeError::EpisodeTooShort { .. }
        )
    }
}
