//! Rule catalogue — evaluated in a fixed order against one `CombinedRecord`.
//!
//! Two shapes of stage:
//!   Tier    → ordered rules over one domain, first match wins, at most one insight
//!   Overlay → one independent check, fires regardless of what the tiers did
//!
//! Cross-signal rules are overlays that read two or more domains.
pub mod apps;
pub mod battery;
pub mod cross_signal;
pub mod network;
pub mod performance;
pub mod screen;
pub mod sensors;
pub mod storage;
pub mod thermal;

use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::CombinedRecord,
};

/// One condition and the insight it produces.
pub struct Rule {
    pub id:    &'static str,
    pub when:  fn(&CombinedRecord) -> bool,
    pub build: fn(&CombinedRecord) -> DeviceInsight,
}

impl Rule {
    fn fire(&self, record: &CombinedRecord) -> Option<DeviceInsight> {
        if (self.when)(record) {
            Some((self.build)(record))
        } else {
            None
        }
    }
}

/// Mutually exclusive group: rules are tested in order, the first match wins.
pub struct Tier {
    pub name:  &'static str,
    pub rules: &'static [Rule],
}

impl Tier {
    fn first_match(&self, record: &CombinedRecord) -> Option<DeviceInsight> {
        let fired = self.rules.iter().find_map(|r| r.fire(record));
        if let Some(insight) = &fired {
            tracing::trace!("Tier {} fired {}", self.name, insight.id);
        }
        fired
    }
}

pub enum Stage {
    Tier(Tier),
    Overlay(Rule),
}

/// Evaluation order. Tiers and overlays interleave exactly as listed.
pub static CATALOGUE: &[Stage] = &[
    Stage::Tier(battery::LEVEL_TIER),
    Stage::Tier(battery::HEALTH_TIER),
    Stage::Tier(thermal::TIER),
    Stage::Tier(storage::TIER),
    Stage::Overlay(cross_signal::SYSTEM_OVERHEATING),
    Stage::Overlay(cross_signal::MULTIPLE_CRITICAL_ISSUES),
    Stage::Tier(performance::TIER),
    Stage::Tier(network::TIER),
    Stage::Overlay(cross_signal::PERFORMANCE_BATTERY_STRESS),
    Stage::Overlay(cross_signal::HEALTH_EXCELLENT),
    Stage::Overlay(screen::HDR),
    Stage::Overlay(screen::WIDE_COLOR_GAMUT),
    Stage::Overlay(screen::HIGH_REFRESH_RATE),
    Stage::Tier(apps::TIER),
    Stage::Overlay(apps::HEAVY_USAGE),
    Stage::Overlay(cross_signal::STORAGE_APP_PRESSURE),
    Stage::Tier(sensors::TIER),
];

/// Run the whole catalogue. Pure: same record in, same ordered list out.
pub fn evaluate(record: &CombinedRecord) -> Vec<DeviceInsight> {
    CATALOGUE
        .iter()
        .filter_map(|stage| match stage {
            Stage::Tier(tier)    => tier.first_match(record),
            Stage::Overlay(rule) => rule.fire(record),
        })
        .collect()
}

/// Tier names in catalogue order.
pub fn tier_names() -> Vec<&'static str> {
    CATALOGUE
        .iter()
        .filter_map(|stage| match stage {
            Stage::Tier(tier)    => Some(tier.name),
            Stage::Overlay(_)    => None,
        })
        .collect()
}

/// Every id the catalogue can emit, in catalogue order.
pub fn all_ids() -> Vec<&'static str> {
    CATALOGUE
        .iter()
        .flat_map(|stage| match stage {
            Stage::Tier(tier)    => tier.rules.iter().map(|r| r.id).collect::<Vec<_>>(),
            Stage::Overlay(rule) => vec![rule.id],
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Convenience constructor so rules don't repeat boilerplate
// ---------------------------------------------------------------------------

pub fn insight(
    id:             &str,
    category:       InsightCategory,
    severity:       InsightSeverity,
    title:          &str,
    description:    String,
    recommendation: &str,
) -> DeviceInsight {
    let built = DeviceInsight::new(id, category, severity, title, description, recommendation);
    if severity == InsightSeverity::Positive {
        built.informational()
    } else {
        built
    }
}

// ---------------------------------------------------------------------------
// Shared test fixtures
// ---------------------------------------------------------------------------
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::snapshot::*;

    /// A device with nothing worth reporting: every rule stays silent.
    pub fn quiet() -> CombinedRecord {
        CombinedRecord {
            battery: BatteryInfo {
                level:       60,
                temperature: 30.0,
                health:      BatteryHealth::Good,
                is_charging: false,
                voltage_mv:  3_900,
                technology:  "Li-ion".into(),
            },
            thermal: ThermalInfo { status: ThermalStatus::Normal, battery_temperature: 30.0 },
            storage: StorageInfo {
                usage_percentage: 40,
                status:           StorageStatus::Healthy,
                total_bytes:      128_000_000_000,
                used_bytes:       51_200_000_000,
            },
            performance: PerformanceInfo {
                ram_usage_percent:   50,
                cpu_usage_percent:   12.5,
                status:              PerformanceStatus::Good,
                total_ram_bytes:     8_000_000_000,
                available_ram_bytes: 4_000_000_000,
            },
            network: NetworkInfo {
                is_connected:    true,
                network_type:    NetworkType::Wifi,
                signal_strength: 80,
                link_speed_mbps: 433,
            },
            screen: ScreenHealthInfo {
                is_hdr:              false,
                is_wide_color_gamut: false,
                refresh_rate:        60.0,
                display_name:        "Built-in Screen".into(),
                width_px:            1080,
                height_px:           2400,
                density_dpi:         420,
            },
            apps: AppBehaviorInfo {
                running_apps:   12,
                user_apps:      45,
                status:         AppBehaviorStatus::Good,
                top_drain_apps: Vec::new(),
            },
            sensors: SensorsHealthInfo {
                active_sensors:  18,
                total_sensors:   18,
                status:          SensorsStatus::Excellent,
                missing_sensors: Vec::new(),
            },
            audio: AudioHealthInfo {
                status:               AudioStatus::Good,
                music_volume_percent: 40,
                is_muted:             false,
                output_route:         "Speaker".into(),
            },
        }
    }

    pub fn ids(insights: &[crate::insight::DeviceInsight]) -> Vec<&str> {
        insights.iter().map(|i| i.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{ids, quiet};
    use super::*;
    use crate::snapshot::*;
    use std::collections::HashSet;

    #[test]
    fn quiet_device_yields_nothing() {
        assert!(evaluate(&quiet()).is_empty());
    }

    #[test]
    fn tier_names_are_unique() {
        let names = tier_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), 8);
        assert_eq!(names.len(), unique.len());
        assert_eq!(names[0], "battery_level");
    }

    #[test]
    fn catalogue_ids_are_unique() {
        let all = all_ids();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn evaluation_is_repeatable() {
        let mut rec = quiet();
        rec.battery.level = 10;
        rec.storage.status = StorageStatus::Critical;
        rec.thermal.status = ThermalStatus::Hot;
        rec.battery.temperature = 45.0;
        rec.screen.is_hdr = true;

        let first = evaluate(&rec);
        for _ in 0..10 {
            assert_eq!(evaluate(&rec), first);
        }
    }

    #[test]
    fn no_duplicate_ids_even_when_everything_fires() {
        let mut rec = quiet();
        rec.battery.level = 5;
        rec.battery.health = BatteryHealth::Dead;
        rec.battery.temperature = 48.0;
        rec.thermal.status = ThermalStatus::Critical;
        rec.storage.status = StorageStatus::Critical;
        rec.storage.usage_percentage = 97;
        rec.performance.status = PerformanceStatus::Poor;
        rec.performance.ram_usage_percent = 95;
        rec.network.is_connected = false;
        rec.screen.is_hdr = true;
        rec.screen.is_wide_color_gamut = true;
        rec.screen.refresh_rate = 120.0;
        rec.apps.status = AppBehaviorStatus::Concerning;
        rec.apps.user_apps = 180;
        rec.apps.top_drain_apps = vec![AppUsage {
            app_name:           "Video".into(),
            package_name:       "com.example.video".into(),
            usage_time_minutes: 300,
        }];
        rec.sensors.status = SensorsStatus::Poor;

        let out = evaluate(&rec);
        let unique: HashSet<_> = out.iter().map(|i| i.id.clone()).collect();
        assert_eq!(out.len(), unique.len());
        assert_eq!(
            ids(&out),
            vec![
                "battery_low",
                "battery_health_critical",
                "thermal_critical",
                "storage_critical",
                "system_overheating",
                "multiple_critical_issues",
                "performance_poor",
                "network_disconnected",
                "performance_battery_stress",
                "screen_hdr",
                "screen_wide_color_gamut",
                "screen_high_refresh_rate",
                "apps_too_many_running",
                "apps_heavy_usage",
                "storage_app_pressure",
                "sensors_degraded",
            ]
        );
    }

    #[test]
    fn scenario_a_low_battery_only() {
        let mut rec = quiet();
        rec.battery.level = 15;
        rec.battery.is_charging = false;
        rec.battery.health = BatteryHealth::Good;

        let out = evaluate(&rec);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Low Battery");
        assert_eq!(out[0].severity, InsightSeverity::Warning);
    }

    #[test]
    fn scenario_b_healthy_and_excellent() {
        let mut rec = quiet();
        rec.battery.level = 85;
        rec.battery.is_charging = true;

        let out = evaluate(&rec);
        let titles: Vec<&str> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Battery Healthy", "Device Health Excellent"]);
        assert!(out.iter().all(|i| i.severity == InsightSeverity::Positive));
    }

    #[test]
    fn scenario_c_hot_and_overheating() {
        let mut rec = quiet();
        rec.battery.temperature = 42.0;
        rec.thermal.status = ThermalStatus::Hot;

        let out = evaluate(&rec);
        let pairs: Vec<(&str, InsightSeverity)> =
            out.iter().map(|i| (i.title.as_str(), i.severity)).collect();
        assert_eq!(
            pairs,
            vec![
                ("Device Running Hot", InsightSeverity::Warning),
                ("System Overheating", InsightSeverity::Critical),
            ]
        );
    }

    #[test]
    fn storage_change_only_touches_storage_insights() {
        let mut before = quiet();
        before.battery.level = 15;
        before.thermal.status = ThermalStatus::Warm;
        let mut after = before.clone();
        after.storage.status = StorageStatus::Critical;
        after.storage.usage_percentage = 96;

        let a = evaluate(&before);
        let b = evaluate(&after);
        let storage_related = ["storage_critical", "multiple_critical_issues"];

        let keep = |list: &[DeviceInsight]| -> Vec<DeviceInsight> {
            list.iter()
                .filter(|i| !storage_related.contains(&i.id.as_str()))
                .cloned()
                .collect()
        };
        assert_eq!(keep(&a), keep(&b));
        assert!(ids(&b).contains(&"storage_critical"));
        assert!(ids(&b).contains(&"multiple_critical_issues"));
    }

    #[test]
    fn positives_are_not_actionable() {
        let mut rec = quiet();
        rec.battery.level = 90;
        rec.battery.is_charging = true;
        rec.screen.is_hdr = true;
        for i in evaluate(&rec) {
            assert_eq!(i.severity, InsightSeverity::Positive);
            assert!(!i.actionable, "{} should be informational", i.id);
        }
    }
}
