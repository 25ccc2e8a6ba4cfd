//! Serialized, rate-limited call queue.
//!
//! One worker loop consumes jobs in submission order and enforces a
//! minimum gap of `ceil(60000 / requests_per_minute)` ms between job
//! *starts*, which caps throughput at `requests_per_minute` calls per
//! 60-second window under steady load. The gap applies globally: every
//! producer that schedules through the same queue shares the budget.
//!
//! A job that fails resolves only its own caller's channel; the worker
//! moves on to the next job.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Clone)]
pub struct CallQueue {
    tx: mpsc::UnboundedSender<Job>,
    min_gap: Duration,
}

impl CallQueue {
    /// Start the queue worker. Must be called within a tokio runtime.
    pub fn new(requests_per_minute: u32) -> Self {
        let min_gap =
            Duration::from_millis(60_000u64.div_ceil(u64::from(requests_per_minute.max(1))));
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, min_gap));
        Self { tx, min_gap }
    }

    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Enqueue a call and wait for its result.
    ///
    /// Calls run strictly in queue order, one at a time; the returned
    /// future resolves when this call's turn has come and its thunk has
    /// finished.
    pub async fn schedule<T, F, Fut>(&self, thunk: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel::<Result<T>>();
        let job: Job = Box::new(move || -> BoxFuture<'static, ()> {
            Box::pin(async move {
                let _ = done_tx.send(thunk().await);
            })
        });
        self.tx
            .send(job)
            .map_err(|_| Error::Unavailable("call queue worker stopped".into()))?;
        done_rx
            .await
            .map_err(|_| Error::Unavailable("call dropped before completion".into()))?
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, min_gap: Duration) {
    let mut last_start: Option<Instant> = None;
    while let Some(job) = rx.recv().await {
        if let Some(prev) = last_start {
            let next_allowed = prev + min_gap;
            if Instant::now() < next_allowed {
                debug!(gap_ms = min_gap.as_millis() as u64, "waiting for next call slot");
                tokio::time::sleep_until(next_allowed).await;
            }
        }
        last_start = Some(Instant::now());
        job().await;
    }
}
