//! Insight evaluator — the last stage of the pipeline.
//!
//! Receives combined records from the aggregator, checks each one against the
//! record preconditions, runs the rule catalogue and forwards an
//! `InsightBatch` downstream. Passes are strictly sequential; nothing is
//! carried from one pass to the next.
use crate::{
    aggregator::RecordResult,
    error::{EngineError, PipelineError},
    insight::{DeviceInsight, InsightSummary},
    rules,
    snapshot::CombinedRecord,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Output of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightBatch {
    /// Catalogue order, not severity order.
    pub insights: Vec<DeviceInsight>,
    pub summary:  InsightSummary,
}

impl InsightBatch {
    fn new(insights: Vec<DeviceInsight>) -> Self {
        let summary = InsightSummary::from_insights(&insights);
        Self { insights, summary }
    }
}

pub type BatchResult = Result<InsightBatch, PipelineError>;

/// Validate, then evaluate. A malformed record is rejected rather than
/// evaluated into misleading insights.
pub fn evaluate(record: &CombinedRecord) -> Result<Vec<DeviceInsight>, EngineError> {
    record.validate()?;
    Ok(rules::evaluate(record))
}

// ---------------------------------------------------------------------------
// Main engine task
// ---------------------------------------------------------------------------

pub async fn run(
    mut record_rx: Receiver<RecordResult>,
    batch_tx:      Sender<BatchResult>,
    cancel:        CancellationToken,
) -> Result<(), PipelineError> {
    let mut last_summary: Option<InsightSummary> = None;

    loop {
        let incoming = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            next = record_rx.recv() => next,
        };

        let Some(incoming) = incoming else {
            tracing::debug!("Record channel closed, engine exiting");
            return Ok(());
        };

        let outcome = incoming.and_then(|record| {
            evaluate(&record).map_err(|e| {
                tracing::error!("Evaluation rejected record: {}", e);
                PipelineError::from(e)
            })
        });

        match outcome {
            Ok(insights) => {
                let batch = InsightBatch::new(insights);
                tracing::debug!(
                    "Evaluated {} insights: {:?}",
                    batch.insights.len(),
                    batch.insights.iter().map(|i| i.id.as_str()).collect::<Vec<_>>()
                );
                let changed = last_summary.map_or(true, |prev| {
                    prev.critical != batch.summary.critical || prev.warning != batch.summary.warning
                });
                if changed {
                    tracing::info!(
                        "Device health: {} critical, {} warning",
                        batch.summary.critical, batch.summary.warning
                    );
                }
                last_summary = Some(batch.summary);

                if cancel.is_cancelled() || batch_tx.send(Ok(batch)).await.is_err() {
                    return Ok(());
                }
            }
            Err(err) => {
                if !cancel.is_cancelled() {
                    let _ = batch_tx.send(Err(err.clone())).await;
                }
                return Err(err);
            }
        }
    }
}
