//! Local task runtime and the background batch pipeline built on it.

mod error;
mod handle;
mod prefetch;
mod scheduler;
mod task;

pub use error::RuntimeError;
pub use handle::TaskHandle;
pub use prefetch::{BatchSource, BatchStream, ChannelWindowSource, RunningPipeline, RuntimeConfig};
pub use scheduler::{LocalScheduler, Scheduler};
pub use task::{FnTask, Task};
