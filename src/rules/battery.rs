//! Battery level and battery health tiers.
//!
//! Level tier (first match wins):
//!   level < 20                    → Low Battery (warning)
//!   level < 50, not charging      → Battery Moderate (info)
//!   level ≥ 80, charging          → Battery Healthy (positive)
//!
//! Health tier:
//!   OVERHEAT                      → critical
//!   DEAD / OVER_VOLTAGE           → critical
//!   COLD                          → warning
use super::{insight, Rule, Tier};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::{BatteryHealth, CombinedRecord},
};

const LOW_LEVEL:      u8 = 20;
const MODERATE_LEVEL: u8 = 50;
const HEALTHY_LEVEL:  u8 = 80;

pub const LEVEL_TIER: Tier = Tier {
    name:  "battery_level",
    rules: &[
        Rule { id: "battery_low",      when: is_low,      build: low },
        Rule { id: "battery_moderate", when: is_moderate, build: moderate },
        Rule { id: "battery_healthy",  when: is_healthy,  build: healthy },
    ],
};

pub const HEALTH_TIER: Tier = Tier {
    name:  "battery_health",
    rules: &[
        Rule { id: "battery_overheating",     when: is_overheating, build: overheating },
        Rule { id: "battery_health_critical", when: is_failing,     build: failing },
        Rule { id: "battery_too_cold",        when: is_cold,        build: cold },
    ],
};

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

fn is_low(r: &CombinedRecord) -> bool {
    r.battery.level < LOW_LEVEL
}

fn low(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "battery_low",
        InsightCategory::Battery,
        InsightSeverity::Warning,
        "Low Battery",
        format!("Battery is at {}%. Connect a charger soon.", r.battery.level),
        "Enable battery saver and lower screen brightness until you can charge.",
    )
}

fn is_moderate(r: &CombinedRecord) -> bool {
    r.battery.level < MODERATE_LEVEL && !r.battery.is_charging
}

fn moderate(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "battery_moderate",
        InsightCategory::Battery,
        InsightSeverity::Info,
        "Battery Moderate",
        format!("Battery is at {}% and not charging.", r.battery.level),
        "Plan to charge within the next few hours.",
    )
}

fn is_healthy(r: &CombinedRecord) -> bool {
    r.battery.level >= HEALTHY_LEVEL && r.battery.is_charging
}

fn healthy(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "battery_healthy",
        InsightCategory::Battery,
        InsightSeverity::Positive,
        "Battery Healthy",
        format!("Battery is charging and already at {}%.", r.battery.level),
        "Unplug around 80–90% to reduce long-term wear.",
    )
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

fn is_overheating(r: &CombinedRecord) -> bool {
    r.battery.health == BatteryHealth::Overheat
}

fn overheating(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "battery_overheating",
        InsightCategory::Battery,
        InsightSeverity::Critical,
        "Battery Overheating",
        format!("The battery reports overheating at {:.1}°C.", r.battery.temperature),
        "Stop charging, close demanding apps and let the device cool down.",
    )
}

fn is_failing(r: &CombinedRecord) -> bool {
    matches!(r.battery.health, BatteryHealth::Dead | BatteryHealth::OverVoltage)
}

fn failing(r: &CombinedRecord) -> DeviceInsight {
    let condition = match r.battery.health {
        BatteryHealth::OverVoltage => "an over-voltage condition",
        _                          => "a failed cell",
    };
    insight(
        "battery_health_critical",
        InsightCategory::Battery,
        InsightSeverity::Critical,
        "Battery Health Critical",
        format!("The battery reports {}.", condition),
        "Have the battery inspected or replaced by a service center.",
    )
}

fn is_cold(r: &CombinedRecord) -> bool {
    r.battery.health == BatteryHealth::Cold
}

fn cold(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "battery_too_cold",
        InsightCategory::Battery,
        InsightSeverity::Warning,
        "Battery Too Cold",
        format!("The battery is too cold ({:.1}°C) to perform normally.", r.battery.temperature),
        "Warm the device to room temperature before charging.",
    )
}
