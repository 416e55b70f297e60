use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{ConsumerGroupWorker, WorkerSummary};

/// A group of workers sharing one shutdown token.
#[derive(Debug)]
pub struct WorkerPool {
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<WorkerSummary>>,
}

/// Spawn `count` workers built by `make`, each on its own task.
///
/// `make` receives the worker index, which callers use to assign partitions.
pub fn spawn_workers<F>(count: usize, shutdown: CancellationToken, mut make: F) -> WorkerPool
where
    F: FnMut(usize) -> ConsumerGroupWorker,
{
    let handles = (0..count)
        .map(|index| {
            let worker = make(index);
            let token = shutdown.clone();
            tokio::spawn(worker.run(token))
        })
        .collect();
    info!(workers = count, "Consumer workers spawned");
    WorkerPool { shutdown, handles }
}

impl WorkerPool {
    /// Number of workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if no workers were spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Token that stops every worker in the pool.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Cancel all workers and wait for them.
    pub async fn shutdown(self) -> Vec<WorkerSummary> {
        self.shutdown.cancel();
        self.join().await
    }

    /// Wait for every worker to stop. Panicked workers are logged and omitted.
    pub async fn join(self) -> Vec<WorkerSummary> {
        let mut summaries = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(error = %e, "Consumer worker task failed"),
            }
        }
        summaries
    }
}
