//! Shareable latest-value state for the nine producers.
//!
//! Each domain gets one `SnapshotHub`. Producers publish into it; any number
//! of pipelines subscribe to it. A subscription is a sender into the
//! pipeline's merged signal channel: `publish` pushes into every registered
//! sender before it returns, so one pipeline sees publications from all nine
//! hubs in the order the callers made them.
use crate::{
    aggregator::SignalResult,
    error::ProducerError,
    snapshot::{
        AppBehaviorInfo, AudioHealthInfo, BatteryInfo, NetworkInfo, PerformanceInfo,
        ScreenHealthInfo, SensorsHealthInfo, Snapshot, StorageInfo, ThermalInfo,
    },
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

pub type SignalSender = UnboundedSender<SignalResult>;

/// What a hub currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum HubState<T> {
    /// Nothing published yet.
    Empty,
    Value(T),
    /// The producer's stream ended with an error. Terminal.
    Failed(ProducerError),
}

struct HubInner<T> {
    state:       HubState<T>,
    subscribers: Vec<SignalSender>,
}

pub struct SnapshotHub<T: Snapshot> {
    inner: Mutex<HubInner<T>>,
}

impl<T: Snapshot> SnapshotHub<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner { state: HubState::Empty, subscribers: Vec::new() }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current snapshot and deliver it to every subscription.
    /// Ignored once the hub has failed.
    pub fn publish(&self, snapshot: T) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if matches!(inner.state, HubState::Failed(_)) {
            return;
        }
        inner
            .subscribers
            .retain(|tx| tx.send(Ok(snapshot.clone().into_signal())).is_ok());
        inner.state = HubState::Value(snapshot);
    }

    pub fn fail(&self, err: ProducerError) {
        tracing::warn!("{} hub failed: {}", T::DOMAIN, err);
        let mut guard = self.lock();
        for tx in guard.subscribers.drain(..) {
            let _ = tx.send(Err(err.clone()));
        }
        guard.state = HubState::Failed(err);
    }

    pub fn current(&self) -> Option<T> {
        match &self.lock().state {
            HubState::Value(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> HubState<T> {
        self.lock().state.clone()
    }

    /// Register a subscription. The current value (or failure) is delivered
    /// immediately, then every later publication in order.
    pub fn subscribe(&self, tx: SignalSender) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match &inner.state {
            HubState::Empty => inner.subscribers.push(tx),
            HubState::Value(v) => {
                if tx.send(Ok(v.clone().into_signal())).is_ok() {
                    inner.subscribers.push(tx);
                }
            }
            HubState::Failed(err) => {
                let _ = tx.send(Err(err.clone()));
            }
        }
    }

    /// Number of live subscriptions. Producers skip platform reads at zero.
    pub fn subscriber_count(&self) -> usize {
        let mut guard = self.lock();
        guard.subscribers.retain(|tx| !tx.is_closed());
        guard.subscribers.len()
    }
}

impl<T: Snapshot> Default for SnapshotHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Snapshot> Drop for SnapshotHub<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        for tx in inner.subscribers.drain(..) {
            let _ = tx.send(Err(ProducerError::Closed { domain: T::DOMAIN }));
        }
    }
}

/// The nine hubs, shared between producers and pipelines.
#[derive(Clone, Default)]
pub struct DeviceSignals {
    pub battery:     Arc<SnapshotHub<BatteryInfo>>,
    pub thermal:     Arc<SnapshotHub<ThermalInfo>>,
    pub storage:     Arc<SnapshotHub<StorageInfo>>,
    pub performance: Arc<SnapshotHub<PerformanceInfo>>,
    pub network:     Arc<SnapshotHub<NetworkInfo>>,
    pub screen:      Arc<SnapshotHub<ScreenHealthInfo>>,
    pub apps:        Arc<SnapshotHub<AppBehaviorInfo>>,
    pub sensors:     Arc<SnapshotHub<SensorsHealthInfo>>,
    pub audio:       Arc<SnapshotHub<AudioHealthInfo>>,
}

impl DeviceSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe one merged channel to all nine hubs.
    pub fn subscribe_all(&self, tx: &SignalSender) {
        self.battery.subscribe(tx.clone());
        self.thermal.subscribe(tx.clone());
        self.storage.subscribe(tx.clone());
        self.performance.subscribe(tx.clone());
        self.network.subscribe(tx.clone());
        self.screen.subscribe(tx.clone());
        self.apps.subscribe(tx.clone());
        self.sensors.subscribe(tx.clone());
        self.audio.subscribe(tx.clone());
    }

    /// Publish a degraded snapshot into every hub that has never received a value.
    pub fn fill_unavailable(&self) {
        fn fill<T: Snapshot>(hub: &Arc<SnapshotHub<T>>) {
            if matches!(hub.state(), HubState::Empty) {
                tracing::info!("{} has no snapshot yet, publishing degraded value", T::DOMAIN);
                hub.publish(T::unavailable());
            }
        }
        fill(&self.battery);
        fill(&self.thermal);
        fill(&self.storage);
        fill(&self.performance);
        fill(&self.network);
        fill(&self.screen);
        fill(&self.apps);
        fill(&self.sensors);
        fill(&self.audio);
    }
}
