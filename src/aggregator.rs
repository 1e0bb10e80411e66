//! Nine-way combine-latest join.
//!
//! Every hub pushes into one merged channel per pipeline at publish time, so
//! arrival order on that channel is the order publications were made, across
//! all domains. `LatestSlots` holds one slot per domain and only starts
//! emitting once all nine are filled; after that every update produces a
//! fresh `CombinedRecord`.
//!
//! Pipeline position: hubs -> aggregator -> engine
use crate::{
    error::{PipelineError, ProducerError},
    snapshot::{
        AppBehaviorInfo, AudioHealthInfo, BatteryInfo, CombinedRecord, Domain, NetworkInfo,
        PerformanceInfo, ScreenHealthInfo, SensorsHealthInfo, StorageInfo, ThermalInfo,
    },
};
use tokio::sync::mpsc::{Sender, UnboundedReceiver};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// One new snapshot from one domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Battery(BatteryInfo),
    Thermal(ThermalInfo),
    Storage(StorageInfo),
    Performance(PerformanceInfo),
    Network(NetworkInfo),
    Screen(ScreenHealthInfo),
    Apps(AppBehaviorInfo),
    Sensors(SensorsHealthInfo),
    Audio(AudioHealthInfo),
}

impl Signal {
    pub fn domain(&self) -> Domain {
        match self {
            Signal::Battery(_)     => Domain::Battery,
            Signal::Thermal(_)     => Domain::Thermal,
            Signal::Storage(_)     => Domain::Storage,
            Signal::Performance(_) => Domain::Performance,
            Signal::Network(_)     => Domain::Network,
            Signal::Screen(_)      => Domain::Screen,
            Signal::Apps(_)        => Domain::Apps,
            Signal::Sensors(_)     => Domain::Sensors,
            Signal::Audio(_)       => Domain::Audio,
        }
    }
}

// ---------------------------------------------------------------------------
// Join state machine
// ---------------------------------------------------------------------------

/// Latest value per domain plus a count of filled slots.
#[derive(Debug, Default)]
pub struct LatestSlots {
    battery:     Option<BatteryInfo>,
    thermal:     Option<ThermalInfo>,
    storage:     Option<StorageInfo>,
    performance: Option<PerformanceInfo>,
    network:     Option<NetworkInfo>,
    screen:      Option<ScreenHealthInfo>,
    apps:        Option<AppBehaviorInfo>,
    sensors:     Option<SensorsHealthInfo>,
    audio:       Option<AudioHealthInfo>,
    filled:      usize,
}

/// Store `value` in `slot`, bumping `filled` the first time the slot is used.
fn store<T>(slot: &mut Option<T>, filled: &mut usize, value: T) {
    if slot.replace(value).is_none() {
        *filled += 1;
    }
}

impl LatestSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.filled == Domain::ALL.len()
    }

    /// Domains that have not produced a first value yet.
    pub fn missing(&self) -> Vec<Domain> {
        let present = [
            self.battery.is_some(),
            self.thermal.is_some(),
            self.storage.is_some(),
            self.performance.is_some(),
            self.network.is_some(),
            self.screen.is_some(),
            self.apps.is_some(),
            self.sensors.is_some(),
            self.audio.is_some(),
        ];
        Domain::ALL
            .iter()
            .zip(present)
            .filter(|(_, has)| !has)
            .map(|(d, _)| *d)
            .collect()
    }

    /// Apply one update. Returns a record once every slot has a value.
    pub fn apply(&mut self, signal: Signal) -> Option<CombinedRecord> {
        let filled = &mut self.filled;
        match signal {
            Signal::Battery(v)     => store(&mut self.battery, filled, v),
            Signal::Thermal(v)     => store(&mut self.thermal, filled, v),
            Signal::Storage(v)     => store(&mut self.storage, filled, v),
            Signal::Performance(v) => store(&mut self.performance, filled, v),
            Signal::Network(v)     => store(&mut self.network, filled, v),
            Signal::Screen(v)      => store(&mut self.screen, filled, v),
            Signal::Apps(v)        => store(&mut self.apps, filled, v),
            Signal::Sensors(v)     => store(&mut self.sensors, filled, v),
            Signal::Audio(v)       => store(&mut self.audio, filled, v),
        }
        self.record()
    }

    fn record(&self) -> Option<CombinedRecord> {
        if !self.is_complete() {
            return None;
        }
        Some(CombinedRecord {
            battery:     self.battery.clone()?,
            thermal:     self.thermal.clone()?,
            storage:     self.storage.clone()?,
            performance: self.performance.clone()?,
            network:     self.network.clone()?,
            screen:      self.screen.clone()?,
            apps:        self.apps.clone()?,
            sensors:     self.sensors.clone()?,
            audio:       self.audio.clone()?,
        })
    }
}

/// One hub publication, or the error that ended that hub.
pub type SignalResult = Result<Signal, ProducerError>;

// ---------------------------------------------------------------------------
// Aggregator task
// ---------------------------------------------------------------------------

pub type RecordResult = Result<CombinedRecord, PipelineError>;

/// Consume merged signals, emit a combined record per update once all nine
/// domains have reported. An upstream error is forwarded once and ends the task.
///
/// `missing_tx` tracks the domains the join is still waiting on.
pub async fn run(
    mut signal_rx: UnboundedReceiver<SignalResult>,
    record_tx:     Sender<RecordResult>,
    missing_tx:    watch::Sender<Vec<Domain>>,
    cancel:        CancellationToken,
) -> Result<(), PipelineError> {
    let mut slots = LatestSlots::new();
    missing_tx.send_replace(slots.missing());

    loop {
        let incoming = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            next = signal_rx.recv() => next,
        };

        let Some(incoming) = incoming else {
            tracing::debug!("Signal channel closed, aggregator exiting");
            return Ok(());
        };

        match incoming {
            Ok(signal) => {
                let domain = signal.domain();
                let was_complete = slots.is_complete();
                let applied = slots.apply(signal);
                if !was_complete {
                    missing_tx.send_replace(slots.missing());
                }
                let Some(record) = applied else {
                    tracing::debug!("Join waiting on {:?} (got {})", slots.missing(), domain);
                    continue;
                };
                if !was_complete {
                    tracing::info!("All nine domains reported, join is live");
                }
                if cancel.is_cancelled() || record_tx.send(Ok(record)).await.is_err() {
                    return Ok(());
                }
            }
            Err(err) => {
                tracing::error!("Upstream producer error: {}", err);
                let err = PipelineError::from(err);
                if !cancel.is_cancelled() {
                    let _ = record_tx.send(Err(err.clone())).await;
                }
                return Err(err);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::quiet;
    use crate::signals::DeviceSignals;
    use crate::snapshot::{StorageStatus, ThermalStatus};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    type Join = (
        mpsc::UnboundedSender<SignalResult>,
        mpsc::Receiver<RecordResult>,
        watch::Receiver<Vec<Domain>>,
        JoinHandle<Result<(), PipelineError>>,
    );

    fn spawn_join(cancel: CancellationToken) -> Join {
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let (rec_tx, rec_rx) = mpsc::channel(32);
        let (missing_tx, missing_rx) = watch::channel(Domain::ALL.to_vec());
        let task = tokio::spawn(run(sig_rx, rec_tx, missing_tx, cancel));
        (sig_tx, rec_rx, missing_rx, task)
    }

    fn publish_all(signals: &DeviceSignals, rec: &CombinedRecord) {
        signals.battery.publish(rec.battery.clone());
        signals.thermal.publish(rec.thermal.clone());
        signals.storage.publish(rec.storage.clone());
        signals.performance.publish(rec.performance.clone());
        signals.network.publish(rec.network.clone());
        signals.screen.publish(rec.screen.clone());
        signals.apps.publish(rec.apps.clone());
        signals.sensors.publish(rec.sensors.clone());
        signals.audio.publish(rec.audio.clone());
    }

    fn all_signals(rec: &CombinedRecord) -> Vec<Signal> {
        vec![
            Signal::Battery(rec.battery.clone()),
            Signal::Thermal(rec.thermal.clone()),
            Signal::Storage(rec.storage.clone()),
            Signal::Performance(rec.performance.clone()),
            Signal::Network(rec.network.clone()),
            Signal::Screen(rec.screen.clone()),
            Signal::Apps(rec.apps.clone()),
            Signal::Sensors(rec.sensors.clone()),
            Signal::Audio(rec.audio.clone()),
        ]
    }

    #[test]
    fn blocks_until_all_nine_filled() {
        let rec = quiet();
        let mut slots = LatestSlots::new();
        let signals = all_signals(&rec);
        let (last, first_eight) = signals.split_last().unwrap();

        for s in first_eight {
            assert!(slots.apply(s.clone()).is_none());
        }
        assert_eq!(slots.missing(), vec![Domain::Audio]);
        assert_eq!(slots.apply(last.clone()), Some(rec));
        assert!(slots.missing().is_empty());
    }

    #[test]
    fn repeated_domain_does_not_count_twice() {
        let rec = quiet();
        let mut slots = LatestSlots::new();
        for _ in 0..9 {
            assert!(slots.apply(Signal::Battery(rec.battery.clone())).is_none());
        }
        assert_eq!(slots.missing().len(), 8);
    }

    #[test]
    fn single_update_only_changes_its_field() {
        let rec = quiet();
        let mut slots = LatestSlots::new();
        let mut prior = None;
        for s in all_signals(&rec) {
            prior = slots.apply(s);
        }
        let prior = prior.unwrap();

        let mut storage = rec.storage.clone();
        storage.status = StorageStatus::Critical;
        storage.usage_percentage = 97;
        let next = slots.apply(Signal::Storage(storage.clone())).unwrap();

        let mut expected = prior.clone();
        expected.storage = storage;
        assert_eq!(next, expected);
    }

    #[tokio::test]
    async fn emits_in_arrival_order() {
        let rec = quiet();
        let (sig_tx, mut rec_rx, _missing, task) = spawn_join(CancellationToken::new());

        for s in all_signals(&rec) {
            sig_tx.send(Ok(s)).unwrap();
        }
        let statuses = [ThermalStatus::Warm, ThermalStatus::Hot, ThermalStatus::Normal];
        for status in statuses {
            let mut t = rec.thermal.clone();
            t.status = status;
            sig_tx.send(Ok(Signal::Thermal(t))).unwrap();
        }
        drop(sig_tx);

        let mut seen = Vec::new();
        while let Some(r) = rec_rx.recv().await {
            seen.push(r.unwrap().thermal.status);
        }
        assert_eq!(
            seen,
            vec![ThermalStatus::Normal, ThermalStatus::Warm, ThermalStatus::Hot, ThermalStatus::Normal]
        );
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn upstream_error_propagates_and_stops() {
        let rec = quiet();
        let (sig_tx, mut rec_rx, _missing, task) = spawn_join(CancellationToken::new());

        for s in all_signals(&rec) {
            sig_tx.send(Ok(s)).unwrap();
        }
        let err = ProducerError::Failed { domain: Domain::Network, reason: "callback lost".into() };
        sig_tx.send(Err(err.clone())).unwrap();
        let _ = sig_tx.send(Ok(Signal::Audio(rec.audio.clone())));

        assert!(rec_rx.recv().await.unwrap().is_ok());
        assert_eq!(rec_rx.recv().await.unwrap(), Err(PipelineError::Producer(err.clone())));
        assert!(rec_rx.recv().await.is_none());
        assert_eq!(task.await.unwrap(), Err(PipelineError::Producer(err)));
    }

    #[tokio::test]
    async fn cancellation_stops_emission() {
        let rec = quiet();
        let cancel = CancellationToken::new();
        let (sig_tx, mut rec_rx, _missing, task) = spawn_join(cancel.clone());

        cancel.cancel();
        for s in all_signals(&rec) {
            let _ = sig_tx.send(Ok(s));
        }
        assert_eq!(task.await.unwrap(), Err(PipelineError::Cancelled));
        assert!(rec_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn tracks_missing_domains_until_live() {
        let rec = quiet();
        let (sig_tx, mut rec_rx, mut missing, _task) = spawn_join(CancellationToken::new());
        let signals = all_signals(&rec);
        let (last, first_eight) = signals.split_last().unwrap();

        for s in first_eight {
            sig_tx.send(Ok(s.clone())).unwrap();
        }
        missing.wait_for(|m| m.len() == 1).await.unwrap();
        assert_eq!(*missing.borrow(), vec![Domain::Audio]);

        sig_tx.send(Ok(last.clone())).unwrap();
        assert!(rec_rx.recv().await.unwrap().is_ok());
        assert!(missing.borrow().is_empty());
    }

    #[tokio::test]
    async fn hub_failure_reaches_the_join() {
        let signals = DeviceSignals::new();
        publish_all(&signals, &quiet());
        let (sig_tx, mut rec_rx, _missing, task) = spawn_join(CancellationToken::new());
        signals.subscribe_all(&sig_tx);
        drop(sig_tx);

        assert!(rec_rx.recv().await.unwrap().is_ok());
        let err = ProducerError::Failed { domain: Domain::Sensors, reason: "service died".into() };
        signals.sensors.fail(err.clone());

        assert_eq!(rec_rx.recv().await.unwrap(), Err(PipelineError::Producer(err.clone())));
        assert_eq!(task.await.unwrap(), Err(PipelineError::Producer(err)));
    }

    #[tokio::test]
    async fn dropped_hubs_surface_as_closed() {
        let signals = DeviceSignals::new();
        publish_all(&signals, &quiet());
        let (sig_tx, mut rec_rx, _missing, task) = spawn_join(CancellationToken::new());
        signals.subscribe_all(&sig_tx);
        drop(sig_tx);

        assert!(rec_rx.recv().await.unwrap().is_ok());
        drop(signals);

        let got = rec_rx.recv().await.unwrap();
        assert!(matches!(
            got,
            Err(PipelineError::Producer(ProducerError::Closed { domain: Domain::Battery }))
        ));
        assert!(task.await.unwrap().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn records_follow_publish_order_across_domains() {
        const ROUNDS: u32 = 2_000;

        let signals = DeviceSignals::new();
        let mut base = quiet();
        base.battery.temperature = 0.0;
        base.thermal.battery_temperature = 0.0;
        publish_all(&signals, &base);

        let (sig_tx, mut rec_rx, _missing, _task) = spawn_join(CancellationToken::new());
        signals.subscribe_all(&sig_tx);
        drop(sig_tx);

        let publisher = signals.clone();
        let producer = tokio::spawn(async move {
            for i in 1..=ROUNDS {
                let mut battery = base.battery.clone();
                battery.temperature = i as f32;
                publisher.battery.publish(battery);

                let mut thermal = base.thermal.clone();
                thermal.battery_temperature = i as f32;
                publisher.thermal.publish(thermal);

                if i % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        });

        let last = ROUNDS as f32;
        let mut records = 0usize;
        let mut thermal_ahead = 0usize;
        while let Some(rec) = rec_rx.recv().await {
            let rec = rec.unwrap();
            records += 1;
            if rec.thermal.battery_temperature > rec.battery.temperature {
                thermal_ahead += 1;
            }
            if rec.battery.temperature == last && rec.thermal.battery_temperature == last {
                break;
            }
        }
        producer.await.unwrap();

        assert_eq!(thermal_ahead, 0, "thermal@i observed before battery@i");
        assert_eq!(records, 1 + 2 * ROUNDS as usize);
    }
}
