//! One insight subscription: hub subscriptions -> aggregator -> engine, owned
//! as a unit.
//!
//! Each `InsightPipeline::spawn` registers its own merged channel with the nine
//! hubs and builds its own join state, so several screens can evaluate the same
//! `DeviceSignals` side by side. Dropping the pipeline (or calling `shutdown`)
//! cancels every task in the chain; the hubs drop the subscription on their
//! next publish once the merged channel is gone.
use crate::{
    aggregator::{self, RecordResult},
    engine::{self, BatchResult},
    error::PipelineError,
    signals::DeviceSignals,
    snapshot::Domain,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of the record and batch channels.
    pub channel_capacity:    usize,
    /// Warn (once) if no batch has arrived after this long. `None` disables.
    pub first_batch_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity:    64,
            first_batch_timeout: Some(Duration::from_secs(10)),
        }
    }
}

pub struct InsightPipeline {
    batch_rx:       mpsc::Receiver<BatchResult>,
    missing:        watch::Receiver<Vec<Domain>>,
    cancel:         CancellationToken,
    tasks:          Vec<JoinHandle<()>>,
    /// Cleared once the first batch arrives or the warning has been logged.
    first_deadline: Option<Instant>,
    finished:       bool,
}

impl InsightPipeline {
    /// Must be called inside a tokio runtime.
    pub fn spawn(signals: &DeviceSignals, config: &PipelineConfig) -> Self {
        let capacity = config.channel_capacity.max(1);
        let cancel = CancellationToken::new();

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (record_tx, record_rx) = mpsc::channel::<RecordResult>(capacity);
        let (batch_tx, batch_rx)   = mpsc::channel::<BatchResult>(capacity);
        let (missing_tx, missing)  = watch::channel(Domain::ALL.to_vec());

        signals.subscribe_all(&signal_tx);
        drop(signal_tx);

        let mut tasks = Vec::with_capacity(2);

        let token = cancel.clone();
        tasks.push(tokio::spawn(async move {
            match aggregator::run(signal_rx, record_tx, missing_tx, token).await {
                Ok(()) | Err(PipelineError::Cancelled) => {}
                Err(e) => tracing::warn!("Aggregator stopped: {}", e),
            }
        }));

        let token = cancel.clone();
        tasks.push(tokio::spawn(async move {
            match engine::run(record_rx, batch_tx, token).await {
                Ok(()) | Err(PipelineError::Cancelled) => {}
                Err(e) => tracing::warn!("Engine stopped: {}", e),
            }
        }));

        tracing::debug!("Insight pipeline spawned");

        Self {
            batch_rx,
            missing,
            cancel,
            tasks,
            first_deadline: config.first_batch_timeout.map(|wait| Instant::now() + wait),
            finished:       false,
        }
    }

    /// Next evaluation result. `None` once the pipeline is shut down or after
    /// an error has been delivered; the caller resubscribes to retry.
    pub async fn next(&mut self) -> Option<BatchResult> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }

        let item = match self.first_deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, self.recv()).await {
                Ok(item) => item,
                Err(_) => {
                    tracing::warn!(
                        "No insights yet; still waiting on {:?}",
                        *self.missing.borrow()
                    );
                    self.first_deadline = None;
                    self.recv().await
                }
            },
            None => self.recv().await,
        };

        if self.cancel.is_cancelled() {
            return None;
        }
        match &item {
            Some(Ok(_))  => self.first_deadline = None,
            Some(Err(_)) | None => self.finished = true,
        }
        item
    }

    async fn recv(&mut self) -> Option<BatchResult> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = self.batch_rx.recv() => item,
        }
    }

    /// Domains the join has not heard from yet.
    pub fn missing_domains(&self) -> Vec<Domain> {
        self.missing.borrow().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every stage and wait for the tasks to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        self.batch_rx.close();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        tracing::debug!("Insight pipeline shut down");
    }
}

impl Drop for InsightPipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
