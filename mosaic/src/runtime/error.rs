use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("task canceled")]
    Canceled,

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    /// A channel between pipeline stages closed while a value was expected.
    #[error("pipeline channel closed")]
    Closed,

    #[error("no tokio runtime is running")]
    NoRuntime,
}

impl From<tokio::sync::oneshot::error::RecvError> for RuntimeError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        RuntimeError::Canceled
    }
}
