//! Performance tier: POOR → warning, MODERATE → info.
use super::{insight, Rule, Tier};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::{CombinedRecord, PerformanceStatus},
};

pub const TIER: Tier = Tier {
    name:  "performance",
    rules: &[
        Rule { id: "performance_poor",     when: is_poor,     build: poor },
        Rule { id: "performance_moderate", when: is_moderate, build: moderate },
    ],
};

fn is_poor(r: &CombinedRecord) -> bool {
    r.performance.status == PerformanceStatus::Poor
}

fn poor(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "performance_poor",
        InsightCategory::Performance,
        InsightSeverity::Warning,
        "Poor Performance",
        format!(
            "RAM usage is at {}% and CPU at {:.0}%. The device may feel sluggish.",
            r.performance.ram_usage_percent, r.performance.cpu_usage_percent
        ),
        "Close background apps or restart the device.",
    )
}

fn is_moderate(r: &CombinedRecord) -> bool {
    r.performance.status == PerformanceStatus::Moderate
}

fn moderate(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "performance_moderate",
        InsightCategory::Performance,
        InsightSeverity::Info,
        "Moderate Performance",
        format!("RAM usage is at {}%.", r.performance.ram_usage_percent),
        "Closing unused apps will free memory.",
    )
}
