//! Insight output types plus the small amount of presentation help the
//! dashboard needs (severity sort, summary counts).
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightCategory {
    Battery,
    Thermal,
    Storage,
    Performance,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightSeverity {
    Positive,
    Info,
    Warning,
    Critical,
}

impl InsightSeverity {
    pub const fn rank(self) -> u8 {
        match self {
            InsightSeverity::Positive => 0,
            InsightSeverity::Info     => 1,
            InsightSeverity::Warning  => 2,
            InsightSeverity::Critical => 3,
        }
    }
}

impl PartialOrd for InsightSeverity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InsightSeverity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInsight {
    /// Stable per rule; never repeated within one evaluation pass.
    pub id:             String,
    pub category:       InsightCategory,
    pub severity:       InsightSeverity,
    pub title:          String,
    pub description:    String,
    pub recommendation: String,
    #[serde(default = "default_actionable")]
    pub actionable:     bool,
}

fn default_actionable() -> bool { true }

impl DeviceInsight {
    pub fn new(
        id:             &str,
        category:       InsightCategory,
        severity:       InsightSeverity,
        title:          &str,
        description:    String,
        recommendation: &str,
    ) -> Self {
        Self {
            id:             id.to_owned(),
            category,
            severity,
            title:          title.to_owned(),
            description,
            recommendation: recommendation.to_owned(),
            actionable:     default_actionable(),
        }
    }

    /// Mark as informational only (nothing for the user to do).
    pub fn informational(mut self) -> Self {
        self.actionable = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Presentation helpers
// ---------------------------------------------------------------------------

/// Most severe first. Stable, so equal severities keep evaluation order.
pub fn sorted_by_severity(insights: &[DeviceInsight]) -> Vec<DeviceInsight> {
    let mut sorted = insights.to_vec();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
    sorted
}

/// Per-severity counts for summary banners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightSummary {
    pub critical: u32,
    pub warning:  u32,
    pub info:     u32,
    pub positive: u32,
}

impl InsightSummary {
    pub fn from_insights(insights: &[DeviceInsight]) -> Self {
        insights.iter().fold(Self::default(), |mut acc, i| {
            match i.severity {
                InsightSeverity::Critical => acc.critical += 1,
                InsightSeverity::Warning  => acc.warning  += 1,
                InsightSeverity::Info     => acc.info     += 1,
                InsightSeverity::Positive => acc.positive += 1,
            }
            acc
        })
    }

    pub fn has_critical(&self) -> bool {
        self.critical > 0
    }

    pub fn needs_attention(&self) -> bool {
        self.critical + self.warning > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(id: &str, severity: InsightSeverity) -> DeviceInsight {
        DeviceInsight::new(id, InsightCategory::System, severity, id, String::new(), "")
    }

    #[test]
    fn severity_order_follows_rank() {
        assert!(InsightSeverity::Positive < InsightSeverity::Info);
        assert!(InsightSeverity::Info < InsightSeverity::Warning);
        assert!(InsightSeverity::Warning < InsightSeverity::Critical);
    }

    #[test]
    fn sort_is_stable_and_most_severe_first() {
        let list = vec![
            make("a", InsightSeverity::Info),
            make("b", InsightSeverity::Critical),
            make("c", InsightSeverity::Info),
            make("d", InsightSeverity::Positive),
            make("e", InsightSeverity::Critical),
        ];
        let ids: Vec<String> = sorted_by_severity(&list).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b", "e", "a", "c", "d"]);
    }

    #[test]
    fn summary_counts() {
        let list = vec![
            make("a", InsightSeverity::Warning),
            make("b", InsightSeverity::Critical),
            make("c", InsightSeverity::Warning),
            make("d", InsightSeverity::Positive),
        ];
        let s = InsightSummary::from_insights(&list);
        assert_eq!(s, InsightSummary { critical: 1, warning: 2, info: 0, positive: 1 });
        assert!(s.has_critical());
        assert!(s.needs_attention());
        assert!(!InsightSummary::default().needs_attention());
    }

    #[test]
    fn actionable_defaults_true_on_the_wire() {
        let raw = r#"{"id":"x","category":"SYSTEM","severity":"INFO",
                      "title":"t","description":"d","recommendation":"r"}"#;
        let i: DeviceInsight = serde_json::from_str(raw).unwrap();
        assert!(i.actionable);
        assert!(!make("y", InsightSeverity::Positive).informational().actionable);
    }
}
