//! App behavior tier plus the heavy single-app usage overlay.
//!
//! Heavy usage only looks at the head of `top_drain_apps` (highest usage).
use super::{insight, Rule, Tier};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::{AppBehaviorStatus, AppUsage, CombinedRecord},
};

const HEAVY_USAGE_MINUTES: u32 = 120;

pub const TIER: Tier = Tier {
    name:  "apps",
    rules: &[
        Rule { id: "apps_too_many_running", when: is_concerning, build: concerning },
        Rule { id: "apps_many_running",     when: is_moderate,   build: moderate },
    ],
};

pub const HEAVY_USAGE: Rule = Rule { id: "apps_heavy_usage", when: is_heavy, build: heavy };

fn is_concerning(r: &CombinedRecord) -> bool {
    r.apps.status == AppBehaviorStatus::Concerning
}

fn concerning(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "apps_too_many_running",
        InsightCategory::Performance,
        InsightSeverity::Warning,
        "Too Many Running Apps",
        format!("{} apps are running in the background.", r.apps.running_apps),
        "Force-stop apps you are not using and restrict background activity.",
    )
}

fn is_moderate(r: &CombinedRecord) -> bool {
    r.apps.status == AppBehaviorStatus::Moderate
}

fn moderate(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "apps_many_running",
        InsightCategory::Performance,
        InsightSeverity::Info,
        "Many Apps Running",
        format!("{} apps are running.", r.apps.running_apps),
        "Closing a few background apps can improve battery life.",
    )
}

fn top_app(r: &CombinedRecord) -> Option<&AppUsage> {
    r.apps.top_drain_apps.first()
}

fn is_heavy(r: &CombinedRecord) -> bool {
    top_app(r).is_some_and(|app| app.usage_time_minutes > HEAVY_USAGE_MINUTES)
}

fn heavy(r: &CombinedRecord) -> DeviceInsight {
    let (name, minutes) = top_app(r)
        .map(|app| (app.app_name.as_str(), app.usage_time_minutes))
        .unwrap_or(("An app", 0));
    insight(
        "apps_heavy_usage",
        InsightCategory::Battery,
        InsightSeverity::Info,
        "High App Usage Detected",
        format!("{} has been used for {}h {}m today.", name, minutes / 60, minutes % 60),
        "Consider screen-time limits if this usage is unintended.",
    )
}
