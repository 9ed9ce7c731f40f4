//! Bounded-concurrency job pipeline shared by every fan-out in the crate.
//!
//! Architecture:
//! 1. A job channel sized to the job count is filled by a single producer task
//! 2. `N` worker tasks (capped at the job count) drain it and run the handler
//! 3. Results flow back through a second channel sized to the job count
//! 4. The result channel closes once every worker has exited; the caller
//!    drains it until then
//!
//! Cancellation is cooperative. The producer stops enqueueing and workers stop
//! dequeueing and reporting once the token fires, but a job already inside the
//! handler runs to completion.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fixed-size pool of async workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    workers: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// `workers` of zero is treated as one.
    pub fn new(name: &'static str, workers: usize, cancel: CancellationToken) -> Self {
        Self {
            name,
            workers: workers.max(1),
            cancel,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `handler` over every job with at most `workers` in flight.
    ///
    /// Returns one result per completed job, in completion order. When the
    /// token is cancelled the returned vector may be shorter than `jobs`.
    pub async fn run<J, R, F, Fut>(&self, jobs: Vec<J>, handler: F) -> Vec<R>
    where
        J: Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if jobs.is_empty() {
            return Vec::new();
        }

        let total = jobs.len();
        let workers = self.workers.min(total);
        debug!(pool = self.name, total, workers, "Starting worker pool");

        let (job_tx, job_rx) = mpsc::channel::<J>(total);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<R>(total);
        let handler = Arc::new(handler);

        let producer_cancel = self.cancel.clone();
        let name = self.name;
        tokio::spawn(async move {
            for (idx, job) in jobs.into_iter().enumerate() {
                if producer_cancel.is_cancelled() {
                    debug!(pool = name, dispatched = idx, total, "Dispatch cancelled");
                    break;
                }
                if job_tx.send(job).await.is_err() {
                    break;
                }
            }
        });

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let handler = handler.clone();
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = job_rx.lock().await;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            job = rx.recv() => job,
                        }
                    };
                    let Some(job) = job else { break };

                    let result = handler(job).await;

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = result_tx.send(result) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                debug!(pool = name, worker_id, "Worker exiting");
            }));
        }
        drop(result_tx);

        tokio::spawn(async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(pool = name, error = %e, "Worker terminated abnormally");
                }
            }
        });

        let mut results = Vec::with_capacity(total);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }

        debug!(pool = self.name, completed = results.len(), total, "Worker pool drained");
        results
    }
}
