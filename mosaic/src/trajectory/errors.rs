use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EpisodeError {
    #[error("episode '{episode_id}' has no steps")]
    Empty { episode_id: String },

    #[error("episode '{episode_id}': expected step index {expected}, found {found}")]
    IndexGap {
        episode_id: String,
        expected: usize,
        found: usize,
    },

    #[error("episode '{episode_id}': {flag} set incorrectly at index {index}")]
    MisplacedFlag {
        episode_id: String,
        flag: &'static str,
        index: usize,
    },
}
