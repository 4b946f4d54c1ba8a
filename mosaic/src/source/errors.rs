use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed episode record: {message}")]
    Decode {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("unsupported source location '{0}'")]
    Unsupported(String),

    #[error("invalid host shard {index} of {count}")]
    InvalidShard { index: usize, count: usize },
}
