//! Run configuration.
//!
//! Stored as a JSON object on disk; every field is optional:
//! ```json
//! {
//!   "canvas_base_url": "https://canvas.example.edu/api/v1",
//!   "course_id": 12345,
//!   "professor_ids": ["54321"],
//!   "professor_names": ["Professor Name"],
//!   "start_date": "2025-02-15",
//!   "scheme": "tiered",
//!   "bounds": { "max_grade": 5.0, "cap_participations": 7 }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use crate::activity::parse_start_date;
use crate::analyzers::aggregate::AggregateOptions;
use crate::analyzers::apply::GradingOptions;
use crate::analyzers::classify::ActivityThresholds;
use crate::analyzers::grade::SchemeBounds;
use crate::analyzers::utility::MAX_ROUND_DIGITS;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub canvas_base_url: String,
    pub course_id: Option<u64>,
    pub professor_ids: Vec<String>,
    pub professor_names: Vec<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    pub include_forums: bool,
    pub include_messages: bool,
    pub scheme: String,
    pub bounds: SchemeBounds,
    pub thresholds: ActivityThresholds,
    pub round_digits: Option<u32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            canvas_base_url: "https://canvas.instructure.com/api/v1".to_string(),
            course_id: None,
            professor_ids: Vec::new(),
            professor_names: Vec::new(),
            start_date: None,
            include_forums: true,
            include_messages: true,
            scheme: "tiered".to_string(),
            bounds: SchemeBounds::default(),
            thresholds: ActivityThresholds::default(),
            round_digits: Some(1),
        }
    }
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?;

        if let Some(digits) = config.round_digits.filter(|d| *d > MAX_ROUND_DIGITS) {
            warn!(digits, max = MAX_ROUND_DIGITS, "round_digits capped");
            config.round_digits = Some(MAX_ROUND_DIGITS);
        }
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Aggregation filters; fails if `start_date` is malformed.
    pub fn aggregate_options(&self) -> crate::error::Result<AggregateOptions> {
        let start_date = self.start_date.as_deref().map(parse_start_date).transpose()?;
        Ok(AggregateOptions {
            professor_ids: self.professor_ids.iter().cloned().collect(),
            professor_names: self.professor_names.clone(),
            start_date,
            include_forums: self.include_forums,
            include_messages: self.include_messages,
            thresholds: self.thresholds,
        })
    }

    pub fn grading_options(&self) -> GradingOptions {
        GradingOptions {
            bounds: self.bounds,
            round_digits: self.round_digits,
            thresholds: self.thresholds,
        }
    }
}
