//! Raw episode sources.
//!
//! A source is treated as a reliable, rewindable iterator over one dataset's
//! raw episodes. Retrying transient storage failures is the source's job,
//! not the pipeline's.

mod errors;
mod jsonl;

pub use errors::SourceError;
pub use jsonl::JsonlSource;

use serde::{Deserialize, Serialize};

use crate::trajectory::RawEpisode;

pub trait EpisodeSource: Send {
    /// Next episode, or `None` at the end of the dataset.
    fn next_episode(&mut self) -> Result<Option<RawEpisode>, SourceError>;

    /// Restarts from the first episode.
    fn rewind(&mut self) -> Result<(), SourceError>;
}

impl<S: EpisodeSource + ?Sized> EpisodeSource for Box<S> {
    fn next_episode(&mut self) -> Result<Option<RawEpisode>, SourceError> {
        (**self).next_episode()
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        (**self).rewind()
    }
}

/// Episodes held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    episodes: Vec<RawEpisode>,
    cursor: usize,
}

impl MemorySource {
    pub fn new(episodes: Vec<RawEpisode>) -> Self {
        Self {
            episodes,
            cursor: 0,
        }
    }
}

impl EpisodeSource for MemorySource {
    fn next_episode(&mut self) -> Result<Option<RawEpisode>, SourceError> {
        let episode = self.episodes.get(self.cursor).cloned();
        if episode.is_some() {
            self.cursor += 1;
        }
        Ok(episode)
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        Ok(())
    }
}

/// Which slice of every dataset one training process reads: episode `i` of
/// a dataset belongs to process `i % count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostShard {
    pub index: usize,
    pub count: usize,
}

impl Default for HostShard {
    fn default() -> Self {
        Self { index: 0, count: 1 }
    }
}

impl HostShard {
    pub fn new(index: usize, count: usize) -> Result<Self, SourceError> {
        if count == 0 || index >= count {
            return Err(SourceError::InvalidShard { index, count });
        }
        Ok(Self { index, count })
    }

    pub fn is_whole(&self) -> bool {
        self.count == 1
    }
}

/// Restricts a source to one [`HostShard`].
#[derive(Debug)]
pub struct ShardedSource<S> {
    inner: S,
    shard: HostShard,
    position: usize,
}

impl<S: EpisodeSource> ShardedSource<S> {
    pub fn new(inner: S, shard: HostShard) -> Self {
        Self {
            inner,
            shard,
            position: 0,
        }
    }
}

impl<S: EpisodeSource> EpisodeSource for ShardedSource<S> {
    fn next_episode(&mut self) -> Result<Option<RawEpisode>, SourceError> {
        while let Some(episode) = self.inner.next_episode()? {
            let position = self.position;
            self.position += 1;
            if position % self.shard.count == self.shard.index {
                return Ok(Some(episode));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.position = 0;
        self.inner.rewind()
    }
}

/// Opens the source named by a dataset's `source` location. Supported:
/// a path to a JSON-lines file, optionally prefixed with `jsonl://`.
pub fn open(location: &str) -> Result<Box<dyn EpisodeSource>, SourceError> {
    let path = location.strip_prefix("jsonl://").unwrap_or(location);
    if path.is_empty() || path.contains("://") {
        return Err(SourceError::Unsupported(location.to_string()));
    }
    Ok(Box::new(JsonlSource::open(path)?))
}

#[cfg(test)]
mod tests;
