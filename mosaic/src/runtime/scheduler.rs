use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{RuntimeError, Task, TaskHandle};

pub trait Scheduler: Send + Sync {
    fn submit<T: Task>(&self, task: T) -> TaskHandle<T::Output>;
}

/// Runs tasks on the blocking pool of a tokio runtime.
#[derive(Debug, Clone)]
pub struct LocalScheduler {
    handle: Handle,
}

impl LocalScheduler {
    /// Binds to the runtime the caller is running on.
    pub fn current() -> Result<Self, RuntimeError> {
        Handle::try_current()
            .map(Self::with_handle)
            .map_err(|_| RuntimeError::NoRuntime)
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for LocalScheduler {
    fn submit<T: Task>(&self, task: T) -> TaskHandle<T::Output> {
        let task_id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();

        self.handle.spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| task.run()))
                .map_err(|payload| RuntimeError::WorkerPanicked(panic_message(payload.as_ref())));
            // The handle may already be gone; the task is then detached.
            let _ = sender.send(result);
        });

        TaskHandle::new(task_id, receiver)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
