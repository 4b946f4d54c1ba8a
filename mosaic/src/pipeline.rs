//! Builds the full data chain from a [`PipelineConfig`]:
//! source → normalizer → windower per dataset, then the batch assembler,
//! either in the calling thread or on the runtime.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::assemble::{BatchAssembler, SamplingWeights};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::normalize::Normalizer;
use crate::registry::Registry;
use crate::runtime::{LocalScheduler, RunningPipeline};
use crate::schema::CanonicalSchema;
use crate::source::{self, EpisodeSource, ShardedSource};
use crate::stream::DatasetStream;
use crate::window::Windower;

/// Stream type produced for sources opened from dataset locations.
pub type OpenedStream = DatasetStream<ShardedSource<Box<dyn EpisodeSource>>>;

/// A validated pipeline configuration with its frozen registry.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    registry: Registry,
    canonical: Arc<CanonicalSchema>,
    windower: Windower,
    weights: SamplingWeights,
}

impl Pipeline {
    /// Validates every section and every dataset's mapping onto the canonical
    /// schema. Nothing is read from storage yet.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let registry = Registry::from_table(config.datasets.clone())?;
        let canonical = Arc::new(config.canonical.clone());
        for id in registry.ids() {
            Normalizer::new(canonical.clone(), registry.resolve(id)?)?;
        }
        let windower = Windower::new(config.window.length, config.window.stride)?;
        config.assembler.validate()?;
        let weights = config.effective_weights();
        weights.validate()?;

        info!(
            datasets = registry.len(),
            window_length = windower.length(),
            window_stride = windower.stride(),
            batch_size = config.assembler.batch_size,
            shard_count = config.assembler.shard_count,
            host_shard = config.host_shard.index,
            host_count = config.host_shard.count,
            "pipeline configured"
        );
        Ok(Self {
            config,
            registry,
            canonical,
            windower,
            weights,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(PipelineConfig::from_path(path)?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn canonical(&self) -> &CanonicalSchema {
        &self.canonical
    }

    pub fn weights(&self) -> &SamplingWeights {
        &self.weights
    }

    /// Datasets with a positive weight, in id order.
    pub fn active_datasets(&self) -> Vec<String> {
        self.registry
            .ids()
            .filter(|id| self.weights.get(id).is_some_and(|w| w > 0.0))
            .map(str::to_string)
            .collect()
    }

    /// Wraps `source` into the window stream of dataset `id`.
    pub fn stream<S: EpisodeSource>(&self, id: &str, source: S) -> Result<DatasetStream<ShardedSource<S>>> {
        let spec = self.registry.resolve(id)?;
        let normalizer = Normalizer::new(self.canonical.clone(), spec)?;
        let source = ShardedSource::new(source, self.config.host_shard);
        Ok(DatasetStream::new(source, normalizer, self.windower).with_policy(self.config.on_empty_episode))
    }

    /// Opens the storage location named by dataset `id`'s spec.
    pub fn open_stream(&self, id: &str) -> Result<OpenedStream> {
        let spec = self.registry.resolve(id)?;
        let source = source::open(&self.config.resolve_source(&spec.source))?;
        self.stream(id, source)
    }

    fn open_active(&self) -> Result<Vec<OpenedStream>> {
        self.active_datasets()
            .iter()
            .map(|id| self.open_stream(id))
            .collect()
    }

    fn streams_from<S: EpisodeSource>(
        &self,
        sources: impl IntoIterator<Item = (String, S)>,
    ) -> Result<Vec<DatasetStream<ShardedSource<S>>>> {
        sources
            .into_iter()
            .map(|(id, source)| self.stream(&id, source))
            .collect()
    }

    /// Synchronous assembler over every positively weighted dataset's
    /// configured source.
    pub fn assembler(&self) -> Result<BatchAssembler<OpenedStream>> {
        BatchAssembler::new(self.open_active()?, &self.weights, self.config.assembler)
    }

    /// Synchronous assembler over caller-supplied sources keyed by dataset id.
    pub fn assembler_with_sources<S: EpisodeSource>(
        &self,
        sources: impl IntoIterator<Item = (String, S)>,
    ) -> Result<BatchAssembler<DatasetStream<ShardedSource<S>>>> {
        BatchAssembler::new(self.streams_from(sources)?, &self.weights, self.config.assembler)
    }

    /// Starts the background pipeline on the current tokio runtime.
    pub fn spawn(&self) -> Result<RunningPipeline> {
        let scheduler = LocalScheduler::current()?;
        RunningPipeline::launch(
            &scheduler,
            self.open_active()?,
            &self.weights,
            self.config.assembler,
            self.config.runtime,
        )
    }

    pub fn spawn_with_sources<S: EpisodeSource + 'static>(
        &self,
        sources: impl IntoIterator<Item = (String, S)>,
    ) -> Result<RunningPipeline> {
        let scheduler = LocalScheduler::current()?;
        RunningPipeline::launch(
            &scheduler,
            self.streams_from(sources)?,
            &self.weights,
            self.config.assembler,
            self.config.runtime,
        )
    }
}
