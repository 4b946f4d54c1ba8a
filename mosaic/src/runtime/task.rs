/// A unit of blocking work for the scheduler.
///
/// Pipeline stages read files and normalize episodes synchronously, so tasks
/// run to completion on a blocking thread instead of returning futures.
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    fn run(self) -> Self::Output;
}

/// Adapts a closure into a [`Task`].
pub struct FnTask<F>(pub F);

impl<F, T> Task for FnTask<F>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn run(self) -> T {
        (self.0)()
    }
}
