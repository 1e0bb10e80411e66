//! Domain snapshots — one immutable reading per device-health domain.
//!
//! Producers build these from platform telemetry and publish them through
//! `signals::SnapshotHub`. The aggregator joins the latest nine into a
//! `CombinedRecord`, which is the only input the rule engine sees.
//!
//! Wire format is JSON with camelCase fields so host-side exports can be
//! deserialized directly (see `producer::FileProducer`).
use crate::{aggregator::Signal, error::EngineError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Battery,
    Thermal,
    Storage,
    Performance,
    Network,
    Screen,
    Apps,
    Sensors,
    Audio,
}

impl Domain {
    pub const ALL: [Domain; 9] = [
        Domain::Battery,
        Domain::Thermal,
        Domain::Storage,
        Domain::Performance,
        Domain::Network,
        Domain::Screen,
        Domain::Apps,
        Domain::Sensors,
        Domain::Audio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Domain::Battery     => "battery",
            Domain::Thermal     => "thermal",
            Domain::Storage     => "storage",
            Domain::Performance => "performance",
            Domain::Network     => "network",
            Domain::Screen      => "screen",
            Domain::Apps        => "apps",
            Domain::Sensors     => "sensors",
            Domain::Audio       => "audio",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ties a snapshot type to its domain, its degraded value and its join slot.
pub trait Snapshot: Clone + Send + Sync + fmt::Debug + 'static {
    const DOMAIN: Domain;

    /// Value published when the domain cannot be read at all. Degraded
    /// values trigger no insight on their own.
    fn unavailable() -> Self;

    fn into_signal(self) -> Signal;
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatteryHealth {
    Good,
    Overheat,
    Dead,
    OverVoltage,
    Cold,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryInfo {
    /// 0–100
    pub level:        u8,
    /// Celsius
    pub temperature:  f32,
    pub health:       BatteryHealth,
    pub is_charging:  bool,
    #[serde(default)]
    pub voltage_mv:   u32,
    #[serde(default)]
    pub technology:   String,
}

impl Snapshot for BatteryInfo {
    const DOMAIN: Domain = Domain::Battery;

    // Level 50 sits exactly on the "moderate" boundary, so no level insight fires.
    fn unavailable() -> Self {
        Self {
            level:       50,
            temperature: 0.0,
            health:      BatteryHealth::Unknown,
            is_charging: false,
            voltage_mv:  0,
            technology:  String::new(),
        }
    }

    fn into_signal(self) -> Signal { Signal::Battery(self) }
}

// ---------------------------------------------------------------------------
// Thermal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermalStatus {
    Normal,
    Warm,
    Hot,
    Critical,
}

impl ThermalStatus {
    /// Explicit ordinal. Comparisons go through this, never declaration order.
    pub const fn rank(self) -> u8 {
        match self {
            ThermalStatus::Normal   => 0,
            ThermalStatus::Warm     => 1,
            ThermalStatus::Hot      => 2,
            ThermalStatus::Critical => 3,
        }
    }
}

impl PartialOrd for ThermalStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ThermalStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalInfo {
    pub status:              ThermalStatus,
    pub battery_temperature: f32,
}

impl Snapshot for ThermalInfo {
    const DOMAIN: Domain = Domain::Thermal;

    fn unavailable() -> Self {
        Self { status: ThermalStatus::Normal, battery_temperature: 0.0 }
    }

    fn into_signal(self) -> Signal { Signal::Thermal(self) }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    /// 0–100
    pub usage_percentage: u8,
    pub status:           StorageStatus,
    #[serde(default)]
    pub total_bytes:      u64,
    #[serde(default)]
    pub used_bytes:       u64,
}

impl Snapshot for StorageInfo {
    const DOMAIN: Domain = Domain::Storage;

    fn unavailable() -> Self {
        Self {
            usage_percentage: 0,
            status:           StorageStatus::Healthy,
            total_bytes:      0,
            used_bytes:       0,
        }
    }

    fn into_signal(self) -> Signal { Signal::Storage(self) }
}

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceStatus {
    Excellent,
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInfo {
    /// 0–100
    pub ram_usage_percent:   u8,
    pub cpu_usage_percent:   f32,
    pub status:              PerformanceStatus,
    #[serde(default)]
    pub total_ram_bytes:     u64,
    #[serde(default)]
    pub available_ram_bytes: u64,
}

impl Snapshot for PerformanceInfo {
    const DOMAIN: Domain = Domain::Performance;

    fn unavailable() -> Self {
        Self {
            ram_usage_percent:   0,
            cpu_usage_percent:   0.0,
            status:              PerformanceStatus::Good,
            total_ram_bytes:     0,
            available_ram_bytes: 0,
        }
    }

    fn into_signal(self) -> Signal { Signal::Performance(self) }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkType {
    Wifi,
    Cellular,
    Ethernet,
    Vpn,
    None,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub is_connected:    bool,
    pub network_type:    NetworkType,
    /// 0–100
    pub signal_strength: u8,
    #[serde(default)]
    pub link_speed_mbps: u32,
}

impl Snapshot for NetworkInfo {
    const DOMAIN: Domain = Domain::Network;

    // Connectivity is unknown rather than absent, so no network warning fires.
    fn unavailable() -> Self {
        Self {
            is_connected:    true,
            network_type:    NetworkType::Unknown,
            signal_strength: 100,
            link_speed_mbps: 0,
        }
    }

    fn into_signal(self) -> Signal { Signal::Network(self) }
}

// ---------------------------------------------------------------------------
// Screen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenHealthInfo {
    pub is_hdr:              bool,
    pub is_wide_color_gamut: bool,
    /// Hz
    pub refresh_rate:        f32,
    pub display_name:        String,
    #[serde(default)]
    pub width_px:            u32,
    #[serde(default)]
    pub height_px:           u32,
    #[serde(default)]
    pub density_dpi:         u32,
}

impl Snapshot for ScreenHealthInfo {
    const DOMAIN: Domain = Domain::Screen;

    fn unavailable() -> Self {
        Self {
            is_hdr:              false,
            is_wide_color_gamut: false,
            refresh_rate:        60.0,
            display_name:        "Unknown".to_owned(),
            width_px:            0,
            height_px:           0,
            density_dpi:         0,
        }
    }

    fn into_signal(self) -> Signal { Signal::Screen(self) }
}

// ---------------------------------------------------------------------------
// App behavior
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppBehaviorStatus {
    Good,
    Moderate,
    Concerning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUsage {
    pub app_name:            String,
    #[serde(default)]
    pub package_name:        String,
    pub usage_time_minutes:  u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppBehaviorInfo {
    pub running_apps:   u32,
    pub user_apps:      u32,
    pub status:         AppBehaviorStatus,
    /// Descending by usage; only the head is inspected by the rules.
    #[serde(default)]
    pub top_drain_apps: Vec<AppUsage>,
}

impl Snapshot for AppBehaviorInfo {
    const DOMAIN: Domain = Domain::Apps;

    fn unavailable() -> Self {
        Self {
            running_apps:   0,
            user_apps:      0,
            status:         AppBehaviorStatus::Good,
            top_drain_apps: Vec::new(),
        }
    }

    fn into_signal(self) -> Signal { Signal::Apps(self) }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorsStatus {
    Excellent,
    Good,
    Poor,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsHealthInfo {
    pub active_sensors:  u32,
    pub total_sensors:   u32,
    pub status:          SensorsStatus,
    #[serde(default)]
    pub missing_sensors: Vec<String>,
}

impl Snapshot for SensorsHealthInfo {
    const DOMAIN: Domain = Domain::Sensors;

    fn unavailable() -> Self {
        Self {
            active_sensors:  0,
            total_sensors:   0,
            status:          SensorsStatus::Unavailable,
            missing_sensors: Vec::new(),
        }
    }

    fn into_signal(self) -> Signal { Signal::Sensors(self) }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioStatus {
    Excellent,
    Good,
    Poor,
    Unavailable,
}

/// Carried through the join for display; no current rule reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioHealthInfo {
    pub status:               AudioStatus,
    #[serde(default)]
    pub music_volume_percent: u8,
    #[serde(default)]
    pub is_muted:             bool,
    #[serde(default)]
    pub output_route:         String,
}

impl Snapshot for AudioHealthInfo {
    const DOMAIN: Domain = Domain::Audio;

    fn unavailable() -> Self {
        Self {
            status:               AudioStatus::Unavailable,
            music_volume_percent: 0,
            is_muted:             false,
            output_route:         String::new(),
        }
    }

    fn into_signal(self) -> Signal { Signal::Audio(self) }
}

// ---------------------------------------------------------------------------
// Combined record
// ---------------------------------------------------------------------------

/// The nine latest snapshots, rebuilt on every join. Valid for one
/// evaluation pass; it has no identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub battery:     BatteryInfo,
    pub thermal:     ThermalInfo,
    pub storage:     StorageInfo,
    pub performance: PerformanceInfo,
    pub network:     NetworkInfo,
    pub screen:      ScreenHealthInfo,
    pub apps:        AppBehaviorInfo,
    pub sensors:     SensorsHealthInfo,
    pub audio:       AudioHealthInfo,
}

fn malformed(field: &'static str, problem: impl Into<String>) -> EngineError {
    EngineError::MalformedRecord { field, problem: problem.into() }
}

fn check_percent(field: &'static str, value: u8) -> Result<(), EngineError> {
    if value > 100 {
        return Err(malformed(field, format!("out of range: {}", value)));
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f32) -> Result<(), EngineError> {
    if !value.is_finite() {
        return Err(malformed(field, format!("not finite: {}", value)));
    }
    Ok(())
}

impl CombinedRecord {
    /// Precondition check run before every evaluation pass.
    pub fn validate(&self) -> Result<(), EngineError> {
        check_percent("battery.level", self.battery.level)?;
        check_finite("battery.temperature", self.battery.temperature)?;
        check_finite("thermal.batteryTemperature", self.thermal.battery_temperature)?;
        check_percent("storage.usagePercentage", self.storage.usage_percentage)?;
        check_percent("performance.ramUsagePercent", self.performance.ram_usage_percent)?;
        check_finite("performance.cpuUsagePercent", self.performance.cpu_usage_percent)?;
        check_percent("network.signalStrength", self.network.signal_strength)?;
        check_finite("screen.refreshRate", self.screen.refresh_rate)?;

        if self.sensors.active_sensors > self.sensors.total_sensors {
            return Err(malformed(
                "sensors.activeSensors",
                format!(
                    "{} active exceeds {} total",
                    self.sensors.active_sensors, self.sensors.total_sensors
                ),
            ));
        }

        let sorted = self
            .apps
            .top_drain_apps
            .windows(2)
            .all(|w| w[0].usage_time_minutes >= w[1].usage_time_minutes);
        if !sorted {
            return Err(malformed("apps.topDrainApps", "not sorted by usage descending"));
        }

        Ok(())
    }

    /// A record built entirely from degraded snapshots.
    pub fn unavailable() -> Self {
        Self {
            battery:     BatteryInfo::unavailable(),
            thermal:     ThermalInfo::unavailable(),
            storage:     StorageInfo::unavailable(),
            performance: PerformanceInfo::unavailable(),
            network:     NetworkInfo::unavailable(),
            screen:      ScreenHealthInfo::unavailable(),
            apps:        AppBehaviorInfo::unavailable(),
            sensors:     SensorsHealthInfo::unavailable(),
            audio:       AudioHealthInfo::unavailable(),
        }
    }
}
