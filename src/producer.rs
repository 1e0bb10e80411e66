//! Snapshot producers — the boundary between platform telemetry and the hubs.
//!
//! `PollingProducer` drives any `SnapshotSource` on a timer (storage, RAM,
//! app usage and similar on-demand readings). `FileProducer` watches a JSON
//! device report exported by the host and republishes every domain it
//! contains whenever the file changes.
//!
//! Failure policy:
//!   Unavailable on first read  → publish the domain's degraded snapshot
//!   Unavailable later          → keep the last value
//!   Failed / Closed            → fail the hub; subscribers see the error
use crate::{
    error::ProducerError,
    signals::{DeviceSignals, SnapshotHub},
    snapshot::{
        AppBehaviorInfo, AudioHealthInfo, BatteryInfo, NetworkInfo, PerformanceInfo,
        ScreenHealthInfo, SensorsHealthInfo, Snapshot, StorageInfo, ThermalInfo,
    },
};
use anyhow::{bail, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Common lifecycle of every producer.
pub trait SnapshotProducer {
    type Snapshot;

    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn current_snapshot(&self) -> Option<Self::Snapshot>;
}

/// One synchronous platform reading.
pub trait SnapshotSource: Send + 'static {
    type Snapshot: Snapshot;

    fn read(&mut self) -> Result<Self::Snapshot, ProducerError>;
}

// ---------------------------------------------------------------------------
// Polling producer
// ---------------------------------------------------------------------------

pub struct PollingProducer<S: SnapshotSource> {
    source:   Arc<Mutex<S>>,
    hub:      Arc<SnapshotHub<S::Snapshot>>,
    interval: Duration,
    cancel:   Option<CancellationToken>,
    handle:   Option<JoinHandle<()>>,
}

impl<S: SnapshotSource> PollingProducer<S> {
    pub fn new(source: S, hub: Arc<SnapshotHub<S::Snapshot>>, interval: Duration) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            hub,
            interval: interval.max(Duration::from_millis(1)),
            cancel: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<S: SnapshotSource> SnapshotProducer for PollingProducer<S> {
    type Snapshot = S::Snapshot;

    /// Must be called inside a tokio runtime.
    fn start(&mut self) -> Result<()> {
        if self.is_running() {
            bail!("{} producer already running", S::Snapshot::DOMAIN);
        }
        let cancel = CancellationToken::new();
        self.handle = Some(tokio::spawn(poll_loop(
            self.source.clone(),
            self.hub.clone(),
            self.interval,
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
        tracing::info!("{} producer started (every {:?})", S::Snapshot::DOMAIN, self.interval);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            tracing::info!("{} producer stopped", S::Snapshot::DOMAIN);
        }
        self.handle = None;
    }

    fn current_snapshot(&self) -> Option<S::Snapshot> {
        self.hub.current()
    }
}

impl<S: SnapshotSource> Drop for PollingProducer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop<S: SnapshotSource>(
    source:   Arc<Mutex<S>>,
    hub:      Arc<SnapshotHub<S::Snapshot>>,
    interval: Duration,
    cancel:   CancellationToken,
) {
    let domain = S::Snapshot::DOMAIN;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut has_value = hub.current().is_some();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Nobody is listening; the first reading is always taken so a late
        // subscriber finds a value waiting.
        if has_value && hub.subscriber_count() == 0 {
            continue;
        }

        let reading = match source.lock() {
            Ok(mut s) => s.read(),
            Err(_) => Err(ProducerError::Failed {
                domain,
                reason: "source lock poisoned".to_owned(),
            }),
        };

        match reading {
            Ok(snapshot) => {
                hub.publish(snapshot);
                has_value = true;
            }
            Err(ProducerError::Unavailable { reason, .. }) if !has_value => {
                tracing::warn!("{} unavailable ({}), publishing degraded snapshot", domain, reason);
                hub.publish(S::Snapshot::unavailable());
                has_value = true;
            }
            Err(ProducerError::Unavailable { reason, .. }) => {
                tracing::warn!("{} unavailable, keeping last value: {}", domain, reason);
            }
            Err(err) => {
                hub.fail(err);
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Device report file
// ---------------------------------------------------------------------------

/// JSON export of any subset of the nine domains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReport {
    pub battery:     Option<BatteryInfo>,
    pub thermal:     Option<ThermalInfo>,
    pub storage:     Option<StorageInfo>,
    pub performance: Option<PerformanceInfo>,
    pub network:     Option<NetworkInfo>,
    pub screen:      Option<ScreenHealthInfo>,
    pub apps:        Option<AppBehaviorInfo>,
    pub sensors:     Option<SensorsHealthInfo>,
    pub audio:       Option<AudioHealthInfo>,
}

impl DeviceReport {
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| anyhow::anyhow!("Device report parse error: {}", e))
    }

    /// Publish every domain present. Returns how many were published.
    pub fn publish_into(&self, signals: &DeviceSignals) -> usize {
        fn put<T: Snapshot>(hub: &Arc<SnapshotHub<T>>, value: &Option<T>) -> usize {
            match value {
                Some(v) => {
                    hub.publish(v.clone());
                    1
                }
                None => 0,
            }
        }
        put(&signals.battery, &self.battery)
            + put(&signals.thermal, &self.thermal)
            + put(&signals.storage, &self.storage)
            + put(&signals.performance, &self.performance)
            + put(&signals.network, &self.network)
            + put(&signals.screen, &self.screen)
            + put(&signals.apps, &self.apps)
            + put(&signals.sensors, &self.sensors)
            + put(&signals.audio, &self.audio)
    }
}

pub struct FileProducer {
    path:    PathBuf,
    signals: DeviceSignals,
    /// Fallback poll interval for watcher backends without native events.
    poll:    Duration,
    latest:  Arc<Mutex<Option<DeviceReport>>>,
    cancel:  Option<CancellationToken>,
    handle:  Option<JoinHandle<()>>,
}

impl FileProducer {
    pub fn new(path: PathBuf, signals: DeviceSignals) -> Self {
        Self {
            path,
            signals,
            poll:   Duration::from_secs(5),
            latest: Arc::new(Mutex::new(None)),
            cancel: None,
            handle: None,
        }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Read the report once and publish it. Returns the number of domains published.
    pub fn load_once(&self) -> Result<usize> {
        load_report(&self.path, &self.signals, &self.latest)
    }
}

fn load_report(
    path:    &Path,
    signals: &DeviceSignals,
    latest:  &Mutex<Option<DeviceReport>>,
) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let report = DeviceReport::parse(&content)?;
    let published = report.publish_into(signals);
    tracing::debug!("Device report loaded: {} domains from {:?}", published, path);
    if let Ok(mut guard) = latest.lock() {
        *guard = Some(report);
    }
    Ok(published)
}

impl SnapshotProducer for FileProducer {
    type Snapshot = DeviceReport;

    /// Must be called inside a tokio runtime.
    fn start(&mut self) -> Result<()> {
        if self.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            bail!("report watcher already running for {:?}", self.path);
        }
        tracing::info!("Report watcher starting: {:?}", self.path);

        if self.path.exists() {
            if let Err(e) = self.load_once() {
                tracing::warn!("Initial report load failed: {}", e);
            }
        } else {
            tracing::info!("Device report not found yet, waiting for the host to write it");
        }

        // Watch the directory; editors and exporters often replace the file.
        let watch_dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let (fs_tx, fs_rx) = mpsc::channel::<notify::Result<Event>>(64);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                // Dropped events are fine: the next one re-reads the whole file.
                let _ = fs_tx.try_send(res);
            },
            notify::Config::default().with_poll_interval(self.poll),
        )?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        let cancel = CancellationToken::new();
        self.handle = Some(tokio::spawn(watch_loop(
            watcher,
            fs_rx,
            self.path.clone(),
            self.signals.clone(),
            self.latest.clone(),
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            tracing::info!("Report watcher stopped: {:?}", self.path);
        }
        self.handle = None;
    }

    fn current_snapshot(&self) -> Option<DeviceReport> {
        self.latest.lock().ok().and_then(|g| g.clone())
    }
}

impl Drop for FileProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn watch_loop(
    _watcher:  RecommendedWatcher,
    mut fs_rx: mpsc::Receiver<notify::Result<Event>>,
    path:      PathBuf,
    signals:   DeviceSignals,
    latest:    Arc<Mutex<Option<DeviceReport>>>,
    cancel:    CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            ev = fs_rx.recv() => ev,
        };
        match event {
            Some(Ok(Event { kind: EventKind::Modify(_) | EventKind::Create(_), paths, .. })) => {
                if paths.iter().any(|p| p.file_name() == path.file_name()) {
                    if let Err(e) = load_report(&path, &signals, &latest) {
                        tracing::warn!("Could not reload device report: {}", e);
                    }
                }
            }
            Some(Ok(_)) => {} // access / remove events
            Some(Err(e)) => tracing::error!("Report watcher error: {}", e),
            None => {
                tracing::warn!("Watcher channel closed, report watcher exiting");
                break;
            }
        }
    }
}
