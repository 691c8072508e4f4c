use serde::Serialize;
use tracing::{info, warn};

use crate::activity::ActivityRecord;
use crate::analyzers::aggregate::aggregate;
use crate::analyzers::apply::apply_grading;
use crate::analyzers::grade::Scheme;
use crate::analyzers::summary::{GradeSummary, summarize};
use crate::analyzers::types::{Aggregation, GradedRow};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::roster::RosterEntry;

/// Everything one grading run produces.
#[derive(Debug, Clone, Serialize)]
pub struct GradingReport {
    pub scheme: String,
    pub aggregation: Aggregation,
    pub graded: Vec<GradedRow>,
    pub summary: GradeSummary,
}

/// Aggregates `records` and grades them with the scheme named in `config`.
pub fn analyze(
    records: &[ActivityRecord],
    config: &AnalysisConfig,
    roster: Option<&[RosterEntry]>,
) -> Result<GradingReport> {
    let scheme = Scheme::resolve(&config.scheme, None)?;
    analyze_with_scheme(records, config, &scheme, roster)
}

/// Like [`analyze`], with an already resolved (possibly custom) scheme.
#[tracing::instrument(skip_all, fields(scheme = scheme.name(), records = records.len()))]
pub fn analyze_with_scheme(
    records: &[ActivityRecord],
    config: &AnalysisConfig,
    scheme: &Scheme,
    roster: Option<&[RosterEntry]>,
) -> Result<GradingReport> {
    let aggregation = aggregate(records, &config.aggregate_options()?);
    if aggregation.rows.is_empty() && roster.is_none() {
        warn!("No participation data; nothing to grade");
    }

    let graded = apply_grading(&aggregation.rows, scheme, &config.grading_options(), roster)?;
    let summary = summarize(&graded);

    info!(
        students = summary.total_students,
        average = summary.average_grade,
        min = summary.min_grade,
        max = summary.max_grade,
        "Grading summary"
    );

    Ok(GradingReport {
        scheme: scheme.name().to_string(),
        aggregation,
        graded,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::grade::{CustomGradeFn, SchemeBounds};
    use crate::error::RaterError;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn records() -> Vec<ActivityRecord> {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        vec![
            ActivityRecord::forum("1", "Ada", ts),
            ActivityRecord::message("1", "Ada", ts),
            ActivityRecord::forum("99", "Prof", ts),
        ]
    }

    #[test]
    fn test_analyze_end_to_end() {
        let config = AnalysisConfig {
            professor_ids: vec!["99".into()],
            ..Default::default()
        };
        let report = analyze(&records(), &config, None).unwrap();

        assert_eq!(report.scheme, "tiered");
        assert_eq!(report.graded.len(), 1);
        assert_eq!(report.graded[0].grade, 2.5);
        assert_eq!(report.aggregation.excluded, 1);
        assert_eq!(report.summary.total_students, 1);
    }

    #[test]
    fn test_analyze_unknown_scheme() {
        let config = AnalysisConfig {
            scheme: "curve".into(),
            ..Default::default()
        };
        assert!(matches!(
            analyze(&records(), &config, None),
            Err(RaterError::UnknownScheme { .. })
        ));
    }

    #[test]
    fn test_analyze_with_custom_scheme() {
        let flat: CustomGradeFn = Arc::new(|_: u32, bounds: &SchemeBounds| bounds.max_grade);
        let scheme = Scheme::resolve("flat", Some(flat)).unwrap();
        let report =
            analyze_with_scheme(&records(), &AnalysisConfig::default(), &scheme, None).unwrap();
        assert_eq!(report.scheme, "flat");
        assert!(report.graded.iter().all(|g| g.grade == 5.0));
    }

    #[test]
    fn test_empty_window_is_not_an_error() {
        let config = AnalysisConfig {
            start_date: Some("2030-01-01".into()),
            ..Default::default()
        };
        let report = analyze(&records(), &config, None).unwrap();
        assert!(report.graded.is_empty());
        assert_eq!(report.summary.total_students, 0);
    }
}
