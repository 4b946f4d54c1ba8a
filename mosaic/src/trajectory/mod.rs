mod errors;
mod types;

pub use errors::EpisodeError;
pub use types::{CanonicalStep, Episode, RawEpisode, RawStep};
