//! Scheduling contexts for completion delivery.

/// A unit of work handed to an `Executor`.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on some scheduling context.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs the job immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Executor for Inline {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Spawns the job onto a tokio runtime.
impl Executor for tokio::runtime::Handle {
    fn execute(&self, job: Job) {
        self.spawn(async move { job() });
    }
}
