//! Storage tier: CRITICAL before WARNING.
use super::{insight, Rule, Tier};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::{CombinedRecord, StorageStatus},
};

pub const TIER: Tier = Tier {
    name:  "storage",
    rules: &[
        Rule { id: "storage_critical", when: is_critical, build: critical },
        Rule { id: "storage_warning",  when: is_warning,  build: warning },
    ],
};

fn is_critical(r: &CombinedRecord) -> bool {
    r.storage.status == StorageStatus::Critical
}

fn critical(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "storage_critical",
        InsightCategory::Storage,
        InsightSeverity::Critical,
        "Storage Almost Full",
        format!(
            "Storage is {}% full. Apps may fail to update or save data.",
            r.storage.usage_percentage
        ),
        "Delete unused apps and large videos, or move photos to cloud storage.",
    )
}

fn is_warning(r: &CombinedRecord) -> bool {
    r.storage.status == StorageStatus::Warning
}

fn warning(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "storage_warning",
        InsightCategory::Storage,
        InsightSeverity::Warning,
        "Storage Getting Full",
        format!("Storage is {}% full.", r.storage.usage_percentage),
        "Clear app caches and old downloads to free space.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::quiet;

    #[test]
    fn tier() {
        let fire = |status: StorageStatus| {
            let mut rec = quiet();
            rec.storage.status = status;
            rec.storage.usage_percentage = 93;
            TIER.first_match(&rec)
        };
        let crit = fire(StorageStatus::Critical).unwrap();
        assert_eq!(crit.title, "Storage Almost Full");
        assert!(crit.description.contains("93%"));
        assert_eq!(fire(StorageStatus::Warning).unwrap().title, "Storage Getting Full");
        assert!(fire(StorageStatus::Healthy).is_none());
    }
}
