//! Thermal tier. HOT is tested before CRITICAL; the statuses are distinct, so
//! order only matters for readability here.
use super::{insight, Rule, Tier};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::{CombinedRecord, ThermalStatus},
};

pub const TIER: Tier = Tier {
    name:  "thermal",
    rules: &[
        Rule { id: "thermal_hot",      when: is_hot,      build: hot },
        Rule { id: "thermal_critical", when: is_critical, build: critical },
        Rule { id: "thermal_warm",     when: is_warm,     build: warm },
    ],
};

fn is_hot(r: &CombinedRecord) -> bool {
    r.thermal.status == ThermalStatus::Hot
}

fn hot(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "thermal_hot",
        InsightCategory::Thermal,
        InsightSeverity::Warning,
        "Device Running Hot",
        format!(
            "The device is running hot (battery at {:.1}°C). Performance may be throttled.",
            r.thermal.battery_temperature
        ),
        "Close games or camera apps and avoid charging while it cools.",
    )
}

fn is_critical(r: &CombinedRecord) -> bool {
    r.thermal.status == ThermalStatus::Critical
}

fn critical(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "thermal_critical",
        InsightCategory::Thermal,
        InsightSeverity::Critical,
        "Critical Temperature",
        format!(
            "The device has reached a critical temperature (battery at {:.1}°C).",
            r.thermal.battery_temperature
        ),
        "Stop using the device and move it out of direct heat immediately.",
    )
}

fn is_warm(r: &CombinedRecord) -> bool {
    r.thermal.status == ThermalStatus::Warm
}

fn warm(_r: &CombinedRecord) -> DeviceInsight {
    insight(
        "thermal_warm",
        InsightCategory::Thermal,
        InsightSeverity::Info,
        "Device Warm",
        "The device is warmer than usual.".to_owned(),
        "Give it a break from heavy workloads if it keeps warming up.",
    )
}
