use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use uuid::Uuid;

use super::RuntimeError;

/// Awaitable result of a submitted [`Task`](super::Task).
///
/// Dropping the handle detaches the task; it keeps running and its output is
/// discarded.
pub struct TaskHandle<T> {
    id: Uuid,
    receiver: oneshot::Receiver<Result<T, RuntimeError>>,
}

// Manual Debug implementation - works regardless of whether T implements Debug
impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("result_type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: Uuid, receiver: oneshot::Receiver<Result<T, RuntimeError>>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, RuntimeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| match result {
                Ok(task_result) => task_result,
                Err(dropped) => Err(dropped.into()),
            })
    }
}
