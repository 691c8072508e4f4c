use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::analyzers::classify::ActivityThresholds;
use crate::analyzers::grade::{Scheme, SchemeBounds};
use crate::analyzers::types::{GradedRow, ParticipationRow};
use crate::analyzers::utility::round_to;
use crate::error::{RaterError, Result};
use crate::roster::RosterEntry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingOptions {
    pub bounds: SchemeBounds,
    /// Decimal places kept in each grade; `None` leaves grades unrounded.
    pub round_digits: Option<u32>,
    /// Used to label rows injected from the roster.
    pub thresholds: ActivityThresholds,
}

impl Default for GradingOptions {
    fn default() -> Self {
        Self {
            bounds: SchemeBounds::default(),
            round_digits: Some(1),
            thresholds: ActivityThresholds::default(),
        }
    }
}

/// Grades every row under `scheme`, merging in the roster when given.
///
/// With a roster, its `full_name` replaces the activity-derived name of any
/// matching row, and every roster student without activity is appended as a
/// zero-count row (in roster order) so that everyone enrolled gets a grade.
/// Active students missing from the roster are kept. Duplicate roster ids
/// fail with [`RaterError::DuplicateIdentity`].
#[tracing::instrument(skip_all, fields(scheme = scheme.name(), rows = rows.len()))]
pub fn apply_grading(
    rows: &[ParticipationRow],
    scheme: &Scheme,
    options: &GradingOptions,
    roster: Option<&[RosterEntry]>,
) -> Result<Vec<GradedRow>> {
    options.bounds.validate()?;

    let merged = match roster {
        Some(entries) => merge_roster(rows, entries, &options.thresholds)?,
        None => rows.to_vec(),
    };

    let graded: Vec<GradedRow> = merged
        .into_iter()
        .map(|row| {
            let raw = scheme.grade(row.total_participations, &options.bounds);
            // Rounding can step past a bound that is not itself round.
            let grade = match options.round_digits {
                Some(digits) => options.bounds.clamp(round_to(raw, digits)),
                None => raw,
            };
            GradedRow { row, grade }
        })
        .collect();

    info!(students = graded.len(), "Grading applied");
    Ok(graded)
}

fn merge_roster(
    rows: &[ParticipationRow],
    roster: &[RosterEntry],
    thresholds: &ActivityThresholds,
) -> Result<Vec<ParticipationRow>> {
    let mut by_id: HashMap<&str, &RosterEntry> = HashMap::with_capacity(roster.len());
    for entry in roster {
        if by_id.insert(entry.user_id.as_str(), entry).is_some() {
            return Err(RaterError::DuplicateIdentity {
                user_id: entry.user_id.clone(),
            });
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut not_enrolled = 0usize;
    let mut name_keyed: Vec<&str> = Vec::new();
    let mut merged = Vec::with_capacity(rows.len().max(roster.len()));

    for original in rows {
        let mut row = original.clone();
        match original.user_id.as_deref() {
            Some(id) => match by_id.get(id) {
                Some(entry) => {
                    seen.insert(entry.user_id.as_str());
                    row.user_name = entry.full_name.clone();
                }
                None => not_enrolled += 1,
            },
            None => name_keyed.push(original.user_name.as_str()),
        }
        merged.push(row);
    }

    let mut injected = 0usize;
    for entry in roster {
        if !seen.contains(entry.user_id.as_str()) {
            merged.push(ParticipationRow::zero(
                &entry.user_id,
                &entry.full_name,
                thresholds,
            ));
            injected += 1;
        }
    }

    if not_enrolled > 0 {
        warn!(not_enrolled, "Active users missing from the roster were kept");
    }
    if !name_keyed.is_empty() {
        warn!(
            names = %name_keyed.join(", "),
            "Rows without a user id cannot match the roster; a listed student may appear twice"
        );
    }
    info!(injected, roster = roster.len(), "Roster merged");

    Ok(merged)
}
