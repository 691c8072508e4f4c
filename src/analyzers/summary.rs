//! Descriptive statistics over graded rows, and side-by-side scheme previews.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::grade::{GradingScheme, SchemeBounds};
use crate::analyzers::types::{ChannelUsage, GradedRow};
use crate::analyzers::utility::{mean, median, round_to, stddev};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub total_students: usize,
    pub average_grade: f64,
    pub median_grade: f64,
    pub min_grade: f64,
    pub max_grade: f64,
    pub std_grade: f64,
    pub students_with_zero: usize,
    /// Students holding the highest grade awarded in this run.
    pub students_with_max: usize,
    /// Students active in both forums and messages.
    pub students_using_both: usize,
    /// Grade (one decimal) to number of students, in ascending grade order.
    pub distribution: BTreeMap<String, usize>,
}

pub fn summarize(graded: &[GradedRow]) -> GradeSummary {
    let grades: Vec<f64> = graded.iter().map(|g| g.grade).collect();

    let avg = mean(&grades);
    let min_grade = grades.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max_grade = grades.iter().copied().reduce(f64::max).unwrap_or(0.0);

    let mut distribution = BTreeMap::new();
    for grade in &grades {
        *distribution.entry(format!("{grade:.1}")).or_insert(0) += 1;
    }

    GradeSummary {
        total_students: grades.len(),
        average_grade: avg,
        median_grade: median(&grades),
        min_grade,
        max_grade,
        std_grade: stddev(&grades, avg),
        students_with_zero: grades.iter().filter(|g| **g == 0.0).count(),
        students_with_max: grades.iter().filter(|g| **g == max_grade).count(),
        students_using_both: graded
            .iter()
            .filter(|g| g.row.channel_usage() == ChannelUsage::Both)
            .count(),
        distribution,
    }
}

/// Grades for one participation count under every built-in scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemePreview {
    pub participations: u32,
    pub grades: Vec<(GradingScheme, f64)>,
}

/// Tabulates every built-in scheme over `counts`, rounded to two decimals.
pub fn preview_schemes(counts: &[u32], bounds: &SchemeBounds) -> Vec<SchemePreview> {
    counts
        .iter()
        .map(|&count| SchemePreview {
            participations: count,
            grades: GradingScheme::ALL
                .iter()
                .map(|scheme| (*scheme, round_to(scheme.grade(count, bounds), 2)))
                .collect(),
        })
        .collect()
}
