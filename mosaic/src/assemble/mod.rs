//! Cross-dataset batch assembly.
//!
//! The assembler draws a dataset by weight, pulls one window from it, passes
//! the window through a bounded shuffle buffer, and groups what comes out
//! into batches that are split evenly across training shards.

mod batch;
mod errors;
mod shuffle;
mod weights;

pub use batch::Batch;
pub use errors::AssembleError;
pub use shuffle::ShuffleBuffer;
pub use weights::SamplingWeights;

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::stream::WindowSource;
use crate::window::Window;

/// Batch, shard and shuffle sizing plus the sampling seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Windows per batch (`B`).
    pub batch_size: usize,
    /// Training shards per batch (`S`); must divide `batch_size`.
    pub shard_count: usize,
    /// Shuffle buffer capacity (`N`); at least `batch_size`.
    pub shuffle_buffer_size: usize,
    pub seed: u64,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shard_count: 1,
            shuffle_buffer_size: 1024,
            seed: 0,
        }
    }
}

impl AssemblerConfig {
    pub fn new(batch_size: usize, shard_count: usize, shuffle_buffer_size: usize) -> Self {
        Self {
            batch_size,
            shard_count,
            shuffle_buffer_size,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), AssembleError> {
        let fail = |msg: String| Err(AssembleError::Configuration(msg));
        if self.batch_size == 0 {
            return fail("batch_size must be positive".to_string());
        }
        if self.shard_count == 0 {
            return fail("shard_count must be positive".to_string());
        }
        if self.batch_size % self.shard_count != 0 {
            return fail(format!(
                "batch_size {} is not divisible by shard_count {}",
                self.batch_size, self.shard_count
            ));
        }
        if self.shuffle_buffer_size < self.batch_size {
            return fail(format!(
                "shuffle_buffer_size {} is smaller than batch_size {}",
                self.shuffle_buffer_size, self.batch_size
            ));
        }
        Ok(())
    }
}

/// Counters since construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Windows pulled per dataset (including those still buffered).
    pub drawn: BTreeMap<String, u64>,
    pub batches: u64,
}

/// Infinite batch producer over one [`WindowSource`] per dataset.
pub struct BatchAssembler<W> {
    ids: Vec<Arc<str>>,
    streams: Vec<W>,
    sampler: WeightedIndex<f64>,
    buffer: ShuffleBuffer<Window>,
    rng: ChaCha8Rng,
    config: AssemblerConfig,
    drawn: Vec<u64>,
    batches: u64,
    halted: bool,
}

impl<W: WindowSource> BatchAssembler<W> {
    /// Validates everything up front; no batch is produced from an invalid
    /// configuration. Every stream needs a weight; streams whose weight is
    /// zero are dropped unread, and zero-weight datasets need no stream.
    pub fn new(
        streams: impl IntoIterator<Item = W>,
        weights: &SamplingWeights,
        config: AssemblerConfig,
    ) -> Result<Self> {
        config.validate()?;
        weights.validate()?;

        let mut by_id: BTreeMap<Arc<str>, W> = BTreeMap::new();
        for stream in streams {
            let id = stream.dataset_id().clone();
            if by_id.insert(id.clone(), stream).is_some() {
                return Err(configuration(format!("two streams for dataset '{id}'")));
            }
        }
        for (id, weight) in weights.iter() {
            if weight > 0.0 && !by_id.contains_key(id) {
                return Err(configuration(format!("dataset '{id}' has a positive weight but no stream")));
            }
        }

        let mut ids = Vec::new();
        let mut active = Vec::new();
        let mut probabilities = Vec::new();
        for (id, stream) in by_id {
            let weight = weights
                .get(&id)
                .ok_or_else(|| configuration(format!("no sampling weight for dataset '{id}'")))?;
            if weight > 0.0 {
                ids.push(id);
                active.push(stream);
                probabilities.push(weight);
            } else {
                debug!(dataset = %id, "dataset excluded by zero weight");
            }
        }
        let sampler = WeightedIndex::new(&probabilities)
            .map_err(|e| configuration(format!("invalid sampling weights: {e}")))?;

        info!(
            datasets = ids.len(),
            batch_size = config.batch_size,
            shard_count = config.shard_count,
            shuffle_buffer_size = config.shuffle_buffer_size,
            seed = config.seed,
            "batch assembler ready"
        );
        Ok(Self {
            drawn: vec![0; ids.len()],
            ids,
            streams: active,
            sampler,
            buffer: ShuffleBuffer::new(config.shuffle_buffer_size),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            batches: 0,
            halted: false,
        })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Datasets that can be sampled, in sampling-table order.
    pub fn active_datasets(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|id| id.as_ref())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn stats(&self) -> AssemblerStats {
        AssemblerStats {
            drawn: self
                .ids
                .iter()
                .zip(&self.drawn)
                .map(|(id, n)| (id.to_string(), *n))
                .collect(),
            batches: self.batches,
        }
    }

    /// Pulls until `batch_size` windows have left the shuffle buffer. Any
    /// pull error discards the partial batch and halts the assembler.
    pub fn next_batch(&mut self) -> Result<Batch> {
        if self.halted {
            return Err(AssembleError::Halted.into());
        }

        let mut windows = Vec::with_capacity(self.config.batch_size);
        while windows.len() < self.config.batch_size {
            let pick = self.sampler.sample(&mut self.rng);
            let window = match self.streams[pick].next_window() {
                Ok(window) => window,
                Err(e) => {
                    self.halted = true;
                    error!(dataset = %self.ids[pick], error = %e, "halting batch assembly");
                    return Err(e);
                }
            };
            self.drawn[pick] += 1;
            if let Some(out) = self.buffer.insert(window, &mut self.rng) {
                windows.push(out);
            }
        }

        let batch = Batch::new(self.batches, windows, self.config.shard_count);
        self.batches += 1;
        debug!(sequence = batch.sequence(), "batch assembled");
        Ok(batch)
    }

    /// Bulk teardown: drops the buffered windows and the source streams.
    pub fn shutdown(mut self) -> AssemblerStats {
        let stats = self.stats();
        self.buffer.clear();
        self.streams.clear();
        info!(batches = stats.batches, "batch assembler shut down");
        stats
    }
}

impl<W: WindowSource> Iterator for BatchAssembler<W> {
    type Item = Result<Batch>;

    /// Yields the error that halted assembly once, then ends.
    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        Some(self.next_batch())
    }
}

/// Builds a [`BatchAssembler`] from explicit sizing.
pub fn assemble<W: WindowSource>(
    streams: impl IntoIterator<Item = W>,
    weights: &SamplingWeights,
    batch_size: usize,
    shard_count: usize,
    shuffle_buffer_size: usize,
    seed: u64,
) -> Result<BatchAssembler<W>> {
    let config = AssemblerConfig::new(batch_size, shard_count, shuffle_buffer_size).with_seed(seed);
    BatchAssembler::new(streams, weights, config)
}

fn configuration(msg: String) -> crate::Error {
    AssembleError::Configuration(msg).into()
}
