//! Fixed-size worker pool over a job queue.
//!
//! Jobs are queued with their index; `workers` tasks pull from the queue
//! until it drains. Results land in an index-keyed map and are replayed in
//! submission order, so output order never depends on completion order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Run `task` over `jobs` with at most `workers` in flight.
///
/// Returns one entry per job in submission order. A job whose task panicked
/// yields `None`. Dropping the returned future aborts in-flight jobs.
pub async fn run_indexed<T, R, F, Fut>(jobs: Vec<T>, workers: usize, task: F) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
{
    let total = jobs.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);

    let (job_tx, job_rx) = mpsc::channel::<(usize, T)>(total);
    for (index, job) in jobs.into_iter().enumerate() {
        // capacity equals job count, never blocks
        if job_tx.try_send((index, job)).is_err() {
            warn!(index, "job queue rejected job");
        }
    }
    drop(job_tx);

    let queue = Arc::new(Mutex::new(job_rx));
    let task = Arc::new(task);
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, R)>();

    let mut set = JoinSet::new();
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let task = Arc::clone(&task);
        let result_tx = result_tx.clone();
        let _ = set.spawn(async move {
            loop {
                let next = queue.lock().await.recv().await;
                let Some((index, job)) = next else {
                    break;
                };
                let result = task(job).await;
                if result_tx.send((index, result)).is_err() {
                    break;
                }
            }
            debug!(worker, "worker drained");
        });
    }
    drop(result_tx);

    let mut results: HashMap<usize, R> = HashMap::with_capacity(total);
    while let Some((index, result)) = result_rx.recv().await {
        let _ = results.insert(index, result);
    }
    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "worker task failed");
        }
    }

    (0..total).map(|i| results.remove(&i)).collect()
}
