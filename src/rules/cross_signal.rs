//! Cross-signal overlays — conditions that read two or more domains at once.
//!
//! These are independent of the tier outcomes and may co-fire with them
//! (e.g. "Low Battery" together with "Multiple Critical Issues").
use super::{insight, Rule};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::{CombinedRecord, StorageStatus, ThermalStatus},
};

const OVERHEAT_BATTERY_C:      f32 = 40.0;
const LOW_BATTERY:             u8  = 20;
const STRESS_RAM_PERCENT:      u8  = 85;
const STRESS_BATTERY:          u8  = 30;
const EXCELLENT_BATTERY:       u8  = 70;
const CLUTTER_STORAGE_PERCENT: u8  = 85;
const CLUTTER_USER_APPS:       u32 = 100;

pub const SYSTEM_OVERHEATING: Rule = Rule {
    id:    "system_overheating",
    when:  is_system_overheating,
    build: system_overheating,
};

pub const MULTIPLE_CRITICAL_ISSUES: Rule = Rule {
    id:    "multiple_critical_issues",
    when:  is_multiple_critical,
    build: multiple_critical,
};

pub const PERFORMANCE_BATTERY_STRESS: Rule = Rule {
    id:    "performance_battery_stress",
    when:  is_under_stress,
    build: under_stress,
};

pub const HEALTH_EXCELLENT: Rule = Rule {
    id:    "health_excellent",
    when:  is_excellent,
    build: excellent,
};

pub const STORAGE_APP_PRESSURE: Rule = Rule {
    id:    "storage_app_pressure",
    when:  is_cluttered,
    build: cluttered,
};

// battery.temperature > 40 and thermal.status ≥ HOT
fn is_system_overheating(r: &CombinedRecord) -> bool {
    r.battery.temperature > OVERHEAT_BATTERY_C && r.thermal.status >= ThermalStatus::Hot
}

fn system_overheating(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "system_overheating",
        InsightCategory::Thermal,
        InsightSeverity::Critical,
        "System Overheating",
        format!(
            "Battery temperature is {:.1}°C while the system reports it is running hot.",
            r.battery.temperature
        ),
        "Unplug the charger, close all apps and let the device cool before further use.",
    )
}

fn is_multiple_critical(r: &CombinedRecord) -> bool {
    r.battery.level < LOW_BATTERY
        && !r.battery.is_charging
        && r.storage.status == StorageStatus::Critical
}

fn multiple_critical(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "multiple_critical_issues",
        InsightCategory::System,
        InsightSeverity::Critical,
        "Multiple Critical Issues",
        format!(
            "Battery is at {}% and storage is {}% full at the same time.",
            r.battery.level, r.storage.usage_percentage
        ),
        "Charge the device first, then free up storage.",
    )
}

fn is_under_stress(r: &CombinedRecord) -> bool {
    r.performance.ram_usage_percent > STRESS_RAM_PERCENT && r.battery.level < STRESS_BATTERY
}

fn under_stress(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "performance_battery_stress",
        InsightCategory::Performance,
        InsightSeverity::Critical,
        "System Under Stress",
        format!(
            "RAM usage is {}% with only {}% battery left; the battery will drain quickly.",
            r.performance.ram_usage_percent, r.battery.level
        ),
        "Close memory-heavy apps and connect a charger.",
    )
}

fn is_excellent(r: &CombinedRecord) -> bool {
    r.battery.level > EXCELLENT_BATTERY
        && r.thermal.status == ThermalStatus::Normal
        && r.storage.status == StorageStatus::Healthy
}

fn excellent(_r: &CombinedRecord) -> DeviceInsight {
    insight(
        "health_excellent",
        InsightCategory::System,
        InsightSeverity::Positive,
        "Device Health Excellent",
        "Battery, temperature and storage are all in good shape.".to_owned(),
        "Keep up the current usage habits.",
    )
}

fn is_cluttered(r: &CombinedRecord) -> bool {
    r.storage.usage_percentage > CLUTTER_STORAGE_PERCENT && r.apps.user_apps > CLUTTER_USER_APPS
}

fn cluttered(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "storage_app_pressure",
        InsightCategory::Storage,
        InsightSeverity::Warning,
        "Too Many Installed Apps",
        format!(
            "{} user apps are installed and storage is {}% full.",
            r.apps.user_apps, r.storage.usage_percentage
        ),
        "Uninstall apps you have not opened in the last month.",
    )
}
