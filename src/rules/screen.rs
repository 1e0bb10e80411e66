//! Display capability positives. Independent overlays: all three may fire.
use super::{insight, Rule};
use crate::{
    insight::{DeviceInsight, InsightCategory, InsightSeverity},
    snapshot::CombinedRecord,
};

const HIGH_REFRESH_HZ: f32 = 90.0;

pub const HDR: Rule = Rule { id: "screen_hdr", when: is_hdr, build: hdr };

pub const WIDE_COLOR_GAMUT: Rule = Rule {
    id:    "screen_wide_color_gamut",
    when:  is_wide_color_gamut,
    build: wide_color_gamut,
};

pub const HIGH_REFRESH_RATE: Rule = Rule {
    id:    "screen_high_refresh_rate",
    when:  is_high_refresh,
    build: high_refresh,
};

fn is_hdr(r: &CombinedRecord) -> bool {
    r.screen.is_hdr
}

fn hdr(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "screen_hdr",
        InsightCategory::System,
        InsightSeverity::Positive,
        "HDR Display",
        format!("{} supports HDR playback.", r.screen.display_name),
        "Use HDR-capable streaming apps for the best picture.",
    )
}

fn is_wide_color_gamut(r: &CombinedRecord) -> bool {
    r.screen.is_wide_color_gamut
}

fn wide_color_gamut(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "screen_wide_color_gamut",
        InsightCategory::System,
        InsightSeverity::Positive,
        "Wide Color Gamut",
        format!("{} renders a wide color gamut.", r.screen.display_name),
        "Photos and videos shot in P3 will display accurately.",
    )
}

fn is_high_refresh(r: &CombinedRecord) -> bool {
    r.screen.refresh_rate >= HIGH_REFRESH_HZ
}

fn high_refresh(r: &CombinedRecord) -> DeviceInsight {
    insight(
        "screen_high_refresh_rate",
        InsightCategory::System,
        InsightSeverity::Positive,
        "High Refresh Rate",
        format!("The display runs at {:.0} Hz for smoother scrolling.", r.screen.refresh_rate),
        "Lower the refresh rate in display settings if you need to save battery.",
    )
}
