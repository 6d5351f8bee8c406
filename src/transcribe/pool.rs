use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;

/// Bounded executor for blocking work.
///
/// At most `size` closures run at once on tokio's blocking threads; callers queue
/// for a slot. Shared by every pipeline invocation in the process.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Pool sized to the number of available processors
    pub fn with_available_parallelism() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `task` on a worker once a slot is free.
    ///
    /// A panic inside `task` is returned as an error.
    pub async fn run<F, T>(&self, task: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("Worker pool closed")?;

        tokio::task::spawn_blocking(move || {
            // Slot is held until the blocking work itself finishes
            let _permit = permit;
            task()
        })
        .await
        .context("Worker task failed")
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}
