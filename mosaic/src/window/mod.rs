//! Fixed-length windows over normalized episodes.
//!
//! Windows borrow their steps from a shared [`Episode`] instead of copying
//! them; padded positions resolve to the episode's final step.

mod errors;

pub use errors::WindowError;

use std::sync::Arc;

use crate::trajectory::{CanonicalStep, Episode};

/// `length` steps of one episode plus a validity mask.
///
/// Valid positions are contiguous from the start. Padding only occurs when
/// the episode is shorter than the window and repeats the final step.
#[derive(Debug, Clone)]
pub struct Window {
    episode: Arc<Episode>,
    start: usize,
    mask: Vec<bool>,
}

impl Window {
    pub fn dataset_id(&self) -> &Arc<str> {
        self.episode.dataset_id()
    }

    pub fn episode_id(&self) -> &str {
        self.episode.episode_id()
    }

    pub fn episode(&self) -> &Arc<Episode> {
        &self.episode
    }

    /// Offset of the first step within the episode.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn valid_len(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }

    /// Step at position `i` (`i < len()`); padded positions repeat the last
    /// valid step.
    pub fn step(&self, i: usize) -> &CanonicalStep {
        let steps = self.episode.steps();
        &steps[(self.start + i).min(steps.len() - 1)]
    }

    pub fn steps(&self) -> impl Iterator<Item = &CanonicalStep> + '_ {
        (0..self.len()).map(move |i| self.step(i))
    }

    /// Row-major `(len, action_dim)` action block.
    pub fn actions(&self) -> Vec<f32> {
        self.steps().flat_map(|s| s.action.iter().copied()).collect()
    }
}

/// Cuts episodes into windows of `length` steps every `stride` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windower {
    length: usize,
    stride: usize,
}

impl Windower {
    pub fn new(length: usize, stride: usize) -> Result<Self, WindowError> {
        if length == 0 {
            return Err(WindowError::InvalidLength);
        }
        if stride == 0 {
            return Err(WindowError::InvalidStride);
        }
        Ok(Self { length, stride })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of windows an episode of `len` steps yields.
    pub fn count(&self, len: usize) -> usize {
        match len {
            0 => 0,
            l if l < self.length => 1,
            l => (l - self.length) / self.stride + 1,
        }
    }

    /// Lazily windows `episode`. Calling this again on the same episode
    /// yields the same windows.
    pub fn window(&self, episode: Arc<Episode>) -> Result<Windows, WindowError> {
        if episode.is_empty() {
            return Err(WindowError::EmptyEpisode {
                dataset: episode.dataset_id().to_string(),
                episode_id: episode.episode_id().to_string(),
            });
        }
        let remaining = self.count(episode.len());
        Ok(Windows {
            episode,
            windower: *self,
            next: 0,
            remaining,
        })
    }
}

/// Iterator returned by [`Windower::window`].
#[derive(Debug, Clone)]
pub struct Windows {
    episode: Arc<Episode>,
    windower: Windower,
    next: usize,
    remaining: usize,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.remaining == 0 {
            return None;
        }
        let start = self.next;
        let valid = (self.episode.len() - start).min(self.windower.length);
        let mut mask = vec![true; valid];
        mask.resize(self.windower.length, false);

        self.next += self.windower.stride;
        self.remaining -= 1;
        Some(Window {
            episode: self.episode.clone(),
            start,
            mask,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Windows {}

#[cfg(test)]
mod tests;
