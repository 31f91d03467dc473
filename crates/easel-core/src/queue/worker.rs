use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Shared;

/// Fixed pool of executors pulling from the shared FIFO.
/// - `request_shutdown()` stops idle workers; a running unit is never interrupted
/// - `shutdown_and_join()` waits for every worker to exit
pub(crate) struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers. Must be called from within a Tokio runtime.
    pub(crate) fn spawn(n: usize, shared: Arc<Shared>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let shared = Arc::clone(&shared);
            let rx = shutdown_rx.clone();
            joins.push(tokio::spawn(worker_loop(worker_id, shared, rx)));
        }

        Self { shutdown_tx, joins }
    }

    pub(crate) fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub(crate) async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    shared: Arc<Shared>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let Some(job) = shared.next_job() else {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shared.notify.notified() => {}
            }
            continue;
        };

        shared.run(worker_id, job).await;
    }
    debug!(worker_id, "worker stopped");
}
