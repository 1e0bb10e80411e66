pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod insight;
pub mod pipeline;
pub mod producer;
pub mod rules;
pub mod signals;
pub mod snapshot;

use anyhow::Result;
use config::AppConfig;
use producer::{FileProducer, SnapshotProducer};
use std::ops::ControlFlow;
use std::path::Path;

pub use engine::InsightBatch;
pub use error::{EngineError, PipelineError, ProducerError};
pub use insight::{DeviceInsight, InsightCategory, InsightSeverity, InsightSummary};
pub use pipeline::{InsightPipeline, PipelineConfig};
pub use signals::DeviceSignals;
pub use snapshot::CombinedRecord;

// ---------------------------------------------------------------------------
// Logging: daily-rolling file without ANSI codes, plus a panic hook that
// routes panics through tracing.
// ---------------------------------------------------------------------------

/// Returns the appender guard; keep it alive for the process lifetime
/// (dropping it flushes and stops the background writer).
pub fn init_logging(
    log_dir: &Path,
    filter:  &str,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "insights.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let directive = filter
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", filter, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Logging already initialised: {}", e))?;

    install_panic_hook();
    tracing::info!("Device health insights logging → {}", log_dir.display());
    Ok(guard)
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::error!("PANIC at {}: {}", location, message);
    }));
}

// ---------------------------------------------------------------------------
// Host entry point
// ---------------------------------------------------------------------------

/// Load config from `config_dir`, start file logging and serve insights over
/// `signals` until the pipeline ends or `on_batch` breaks.
pub async fn run<F>(config_dir: &Path, signals: &DeviceSignals, on_batch: F) -> Result<()>
where
    F: FnMut(&InsightBatch) -> ControlFlow<()>,
{
    let cfg = config::load_or_default(config_dir)?;
    let _guard = match init_logging(&cfg.resolved_log_dir(), &cfg.log_filter) {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!("File logging disabled: {}", e);
            None
        }
    };
    serve(&cfg, signals, on_batch).await
}

/// Run one insight pipeline over `signals`, handing every batch to `on_batch`.
///
/// With a `report_path` configured, the report file feeds the hubs and any
/// domain it does not mention gets its degraded snapshot. Without one, the
/// host's own producers are expected to publish. A pipeline error is returned;
/// the caller decides whether to serve again.
pub async fn serve<F>(cfg: &AppConfig, signals: &DeviceSignals, mut on_batch: F) -> Result<()>
where
    F: FnMut(&InsightBatch) -> ControlFlow<()>,
{
    let mut reports = if cfg.report_path.as_os_str().is_empty() {
        None
    } else {
        let mut producer = FileProducer::new(cfg.report_path.clone(), signals.clone())
            .with_poll_interval(cfg.poll_interval());
        producer.start()?;
        signals.fill_unavailable();
        Some(producer)
    };

    let mut pipeline = InsightPipeline::spawn(signals, &cfg.pipeline());
    let outcome = loop {
        match pipeline.next().await {
            Some(Ok(batch)) => {
                if on_batch(&batch).is_break() {
                    break Ok(());
                }
            }
            Some(Err(e)) => break Err(anyhow::Error::new(e)),
            None => break Ok(()),
        }
    };

    pipeline.shutdown().await;
    if let Some(producer) = reports.as_mut() {
        producer.stop();
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::quiet;
    use crate::snapshot::Domain;
    use tempfile::tempdir;

    fn no_timeout() -> AppConfig {
        AppConfig { first_batch_timeout_ms: 0, ..AppConfig::default() }
    }

    #[tokio::test]
    async fn serves_host_published_signals() {
        let signals = DeviceSignals::new();
        let mut rec = quiet();
        rec.battery.level = 10;
        signals.battery.publish(rec.battery);
        signals.thermal.publish(rec.thermal);
        signals.storage.publish(rec.storage);
        signals.performance.publish(rec.performance);
        signals.network.publish(rec.network);
        signals.screen.publish(rec.screen);
        signals.apps.publish(rec.apps);
        signals.sensors.publish(rec.sensors);
        signals.audio.publish(rec.audio);

        let mut seen = Vec::new();
        serve(&no_timeout(), &signals, |batch| {
            seen.push(batch.summary);
            ControlFlow::Break(())
        })
        .await
        .unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].warning, 1);
        assert_eq!(signals.battery.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn report_with_missing_domains_still_evaluates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(
            &path,
            r#"{ "storage": { "usagePercentage": 97, "status": "CRITICAL" } }"#,
        )
        .unwrap();

        let cfg = AppConfig { report_path: path, ..no_timeout() };
        let signals = DeviceSignals::new();
        let mut ids = Vec::new();
        serve(&cfg, &signals, |batch| {
            ids = batch.insights.iter().map(|i| i.id.clone()).collect();
            ControlFlow::Break(())
        })
        .await
        .unwrap();

        assert_eq!(ids, vec!["storage_critical"]);
    }

    #[tokio::test]
    async fn producer_failure_is_returned() {
        let signals = DeviceSignals::new();
        signals.audio.fail(ProducerError::Failed {
            domain: Domain::Audio,
            reason: "mixer unavailable".into(),
        });
        let res = serve(&no_timeout(), &signals, |_| ControlFlow::Continue(())).await;
        assert!(res.is_err());
    }
}
