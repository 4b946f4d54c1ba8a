use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("window length must be at least 1")]
    InvalidLength,

    #[error("window stride must be at least 1")]
    InvalidStride,

    #[error("dataset '{dataset}': episode '{episode_id}' is empty")]
    EmptyEpisode { dataset: String, episode_id: String },
}
