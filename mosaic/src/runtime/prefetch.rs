//! Background pipeline: one blocking worker per dataset feeding a bounded
//! window channel, and one batch producer feeding a bounded batch channel.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{RuntimeError, Scheduler, Task, TaskHandle};
use crate::assemble::{AssemblerConfig, AssemblerStats, Batch, BatchAssembler, SamplingWeights};
use crate::config::ConfigError;
use crate::error::Result;
use crate::stream::WindowSource;
use crate::window::Window;

/// Channel sizing for a spawned pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Windows each dataset worker may run ahead of the assembler.
    pub window_queue_capacity: usize,
    /// Batches the producer may run ahead of the consumer.
    pub batch_prefetch: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            window_queue_capacity: 1,
            batch_prefetch: 2,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "runtime.window_queue_capacity must be positive".to_string(),
            ));
        }
        if self.batch_prefetch == 0 {
            return Err(ConfigError::Invalid(
                "runtime.batch_prefetch must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Receiving end of a dataset worker, usable wherever a [`WindowSource`] is.
///
/// Pulls block the calling thread, so it belongs on the blocking pool.
#[derive(Debug)]
pub struct ChannelWindowSource {
    dataset_id: Arc<str>,
    receiver: mpsc::Receiver<Result<Window>>,
}

impl WindowSource for ChannelWindowSource {
    fn dataset_id(&self) -> &Arc<str> {
        &self.dataset_id
    }

    fn next_window(&mut self) -> Result<Window> {
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|| Err(RuntimeError::Closed.into()))
    }
}

struct WindowWorker<W> {
    stream: W,
    sender: mpsc::Sender<Result<Window>>,
}

impl<W: WindowSource + 'static> Task for WindowWorker<W> {
    /// Windows delivered before the worker stopped.
    type Output = u64;

    fn run(mut self) -> u64 {
        let dataset = self.stream.dataset_id().clone();
        let mut delivered = 0;
        loop {
            let item = self.stream.next_window();
            let failed = item.is_err();
            if self.sender.blocking_send(item).is_err() || failed {
                break;
            }
            delivered += 1;
        }
        debug!(dataset = %dataset, windows = delivered, "window worker stopped");
        delivered
    }
}

struct BatchProducer<W> {
    assembler: BatchAssembler<W>,
    sender: mpsc::Sender<Result<Batch>>,
}

impl<W: WindowSource + 'static> Task for BatchProducer<W> {
    type Output = AssemblerStats;

    fn run(mut self) -> AssemblerStats {
        loop {
            let item = self.assembler.next_batch();
            let failed = item.is_err();
            if self.sender.blocking_send(item).is_err() || failed {
                break;
            }
        }
        self.assembler.shutdown()
    }
}

/// Batches produced in the background, in assembler order.
///
/// Ends after yielding the error that halted the producer.
#[derive(Debug)]
pub struct BatchStream {
    receiver: mpsc::Receiver<Result<Batch>>,
}

impl Stream for BatchStream {
    type Item = Result<Batch>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Async pull interface for training loops.
#[async_trait]
pub trait BatchSource: Send {
    async fn next_batch(&mut self) -> Result<Batch>;
}

#[async_trait]
impl BatchSource for BatchStream {
    async fn next_batch(&mut self) -> Result<Batch> {
        self.receiver
            .recv()
            .await
            .unwrap_or_else(|| Err(RuntimeError::Closed.into()))
    }
}

/// Handles to a running background pipeline.
#[derive(Debug)]
pub struct RunningPipeline {
    batches: BatchStream,
    producer: TaskHandle<AssemblerStats>,
    workers: Vec<(Arc<str>, TaskHandle<u64>)>,
}

impl RunningPipeline {
    /// Validates the assembler configuration, then starts one worker per
    /// positively weighted stream and the batch producer.
    pub fn launch<S, W>(
        scheduler: &S,
        streams: impl IntoIterator<Item = W>,
        weights: &SamplingWeights,
        config: AssemblerConfig,
        runtime: RuntimeConfig,
    ) -> Result<Self>
    where
        S: Scheduler,
        W: WindowSource + 'static,
    {
        runtime.validate()?;

        let mut pending = Vec::new();
        let mut receivers = Vec::new();
        for stream in streams {
            let (sender, receiver) = mpsc::channel(runtime.window_queue_capacity);
            receivers.push(ChannelWindowSource {
                dataset_id: stream.dataset_id().clone(),
                receiver,
            });
            pending.push(WindowWorker { stream, sender });
        }
        let assembler = BatchAssembler::new(receivers, weights, config)?;

        let mut workers = Vec::new();
        for worker in pending {
            let dataset = worker.stream.dataset_id().clone();
            if weights.get(&dataset).is_some_and(|w| w > 0.0) {
                workers.push((dataset, scheduler.submit(worker)));
            }
        }

        let (sender, receiver) = mpsc::channel(runtime.batch_prefetch);
        let producer = scheduler.submit(BatchProducer { assembler, sender });
        info!(
            workers = workers.len(),
            window_queue_capacity = runtime.window_queue_capacity,
            batch_prefetch = runtime.batch_prefetch,
            "pipeline started"
        );
        Ok(Self {
            batches: BatchStream { receiver },
            producer,
            workers,
        })
    }

    pub fn batches(&mut self) -> &mut BatchStream {
        &mut self.batches
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the batch channel, which stops the producer; the producer's
    /// teardown closes every window channel, which stops the workers. Waits
    /// for all of them.
    pub async fn shutdown(self) -> Result<AssemblerStats> {
        let Self {
            batches,
            producer,
            workers,
        } = self;
        drop(batches);

        let stats = producer.await?;
        for (dataset, worker) in workers {
            match worker.await {
                Ok(windows) => debug!(dataset = %dataset, windows, "worker joined"),
                Err(e) => {
                    warn!(dataset = %dataset, error = %e, "worker failed");
                    return Err(e.into());
                }
            }
        }
        info!(batches = stats.batches, "pipeline shut down");
        Ok(stats)
    }
}

#[async_trait]
impl BatchSource for RunningPipeline {
    async fn next_batch(&mut self) -> Result<Batch> {
        self.batches.next_batch().await
    }
}
