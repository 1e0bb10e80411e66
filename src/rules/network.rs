//! Network tier: disconnected first, then weak signal (< 40).
use super::{insight, Rule, Tier};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::CombinedRecord,
};

const WEAK_SIGNAL: u8 = 40;

pub const TIER: Tier = Tier {
    name:  "network",
    rules: &[
        Rule { id: "network_disconnected", when: is_disconnected, build: disconnected },
        Rule { id: "network_weak_signal",  when: is_weak,         build: weak },
    ],
};

fn is_disconnected(r: &CombinedRecord) -> bool {
    !r.network.is_connected
}

fn disconnected(_r: &CombinedRecord) -> DeviceInsight {
    insight(
        "network_disconnected",
        InsightCategory::System,
        InsightSeverity::Warning,
        "No Network Connection",
        "The device is not connected to any network.".to_owned(),
        "Check Wi-Fi or mobile data settings and turn off airplane mode.",
    )
}

fn is_weak(r: &CombinedRecord) -> bool {
    r.network.signal_strength < WEAK_SIGNAL
}

fn weak(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "network_weak_signal",
        InsightCategory::System,
        InsightSeverity::Info,
        "Weak Network Signal",
        format!("Signal strength is {}%. Weak signal drains the battery faster.", r.network.signal_strength),
        "Move closer to the router or switch to Wi-Fi where available.",
    )
}
