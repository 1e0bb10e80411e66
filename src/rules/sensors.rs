use super::{insight, Rule, Tier};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::{CombinedRecord, SensorsStatus},
};

pub const TIER: Tier = Tier {
    name:  "sensors",
    rules: &[Rule { id: "sensors_degraded", when: is_poor, build: degraded }],
};

fn is_poor(r: &CombinedRecord) -> bool {
    r.sensors.status == SensorsStatus::Poor
}

fn degraded(r: &CombinedRecord) -> DeviceInsight {
    let mut description = format!(
        "Only {} of {} sensors are responding.",
        r.sensors.active_sensors, r.sensors.total_sensors
    );
    if !r.sensors.missing_sensors.is_empty() {
        description.push_str(&format!(" Missing: {}.", r.sensors.missing_sensors.join(", ")));
    }
    insight(
        "sensors_degraded",
        InsightCategory::System,
        InsightSeverity::Warning,
        "Sensor Health Degraded",
        description,
        "Restart the device; if sensors stay unavailable, run the manufacturer diagnostics.",
    )
}
