use serde::Deserialize;

use crate::analyzers::types::ActivityLevel;

/// Lower bounds (inclusive) of each activity level. Counts below `low` are
/// [`ActivityLevel::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActivityThresholds {
    pub low: u32,
    pub moderate: u32,
    pub high: u32,
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        Self {
            low: 1,
            moderate: 3,
            high: 6,
        }
    }
}

/// Maps a participation total to an [`ActivityLevel`].
///
/// | Total (defaults) | Level    |
/// |------------------|----------|
/// | 0                | none     |
/// | 1–2              | low      |
/// | 3–5              | moderate |
/// | >= 6             | high     |
pub fn classify(total: u32, thresholds: &ActivityThresholds) -> ActivityLevel {
    match total {
        t if t >= thresholds.high => ActivityLevel::High,
        t if t >= thresholds.moderate => ActivityLevel::Moderate,
        t if t >= thresholds.low => ActivityLevel::Low,
        _ => ActivityLevel::None,
    }
}
