//! Heterogeneous demonstration-data mixing for generalist robot policies.
//!
//! Each dataset is described declaratively by a [`DatasetSpec`]. Its raw
//! episodes are normalized onto one [`CanonicalSchema`], sliced into
//! fixed-length windows, and mixed by sampling weight into sharded batches.
//!
//! ```no_run
//! # fn main() -> mosaic::Result<()> {
//! let pipeline = mosaic::Pipeline::from_path("mix.json")?;
//! let mut batches = pipeline.assembler()?;
//! let batch = batches.next_batch()?;
//! let (actions, shape) = batch.actions();
//! assert_eq!(actions.len(), shape.iter().product::<usize>());
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod source;
pub mod stream;
pub mod tensor;
pub mod trajectory;
pub mod window;

#[cfg(test)]
mod testing;

pub use assemble::{AssemblerConfig, Batch, BatchAssembler, SamplingWeights, assemble};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use normalize::Normalizer;
pub use pipeline::Pipeline;
pub use registry::{Registry, RegistryBuilder};
pub use runtime::{BatchSource, BatchStream, RunningPipeline};
pub use schema::{CanonicalSchema, DatasetSpec};
pub use stream::{DatasetStream, EmptyEpisodePolicy, WindowSource};
pub use window::{Window, Windower};
