//! Output formatting and persistence for participation results.
//!
//! Supports JSON logging and CSV export for gradebooks.

use anyhow::Result;
use chrono::SecondsFormat;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::analyzers::summary::SchemePreview;
use crate::analyzers::types::{
    ActivityLevel, ChannelUsage, GradedRow, ParticipationDetail, ParticipationRow,
};

#[derive(Serialize)]
struct ParticipationExport<'a> {
    user_id: &'a str,
    user_name: &'a str,
    forum_count: u32,
    message_count: u32,
    total_participations: u32,
    activity_level: ActivityLevel,
    forum_posts: u32,
    forum_replies: u32,
    forum_topics: usize,
    message_conversations: usize,
    communication_preference: ChannelUsage,
    first_activity: String,
    last_activity: String,
}

impl<'a> From<&'a ParticipationDetail> for ParticipationExport<'a> {
    fn from(detail: &'a ParticipationDetail) -> Self {
        let row = &detail.row;
        Self {
            user_id: row.user_id.as_deref().unwrap_or(""),
            user_name: &row.user_name,
            forum_count: row.forum_count,
            message_count: row.message_count,
            total_participations: row.total_participations,
            activity_level: row.activity_level,
            forum_posts: detail.forum_posts,
            forum_replies: detail.forum_replies,
            forum_topics: detail.forum_topics,
            message_conversations: detail.message_conversations,
            communication_preference: detail.communication_preference,
            first_activity: detail.first_activity.to_rfc3339_opts(SecondsFormat::Secs, true),
            last_activity: detail.last_activity.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Serialize)]
struct GradeExport<'a> {
    user_id: &'a str,
    user_name: &'a str,
    forum_count: u32,
    message_count: u32,
    total_participations: u32,
    activity_level: ActivityLevel,
    grade: f64,
}

impl<'a> From<&'a GradedRow> for GradeExport<'a> {
    fn from(graded: &'a GradedRow) -> Self {
        let row: &ParticipationRow = &graded.row;
        Self {
            user_id: row.user_id.as_deref().unwrap_or(""),
            user_name: &row.user_name,
            forum_count: row.forum_count,
            message_count: row.message_count,
            total_participations: row.total_participations,
            activity_level: row.activity_level,
            grade: graded.grade,
        }
    }
}

/// Logs any serializable result as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs a scheme comparison table, one line per participation count.
pub fn print_preview(preview: &[SchemePreview]) {
    for line in preview {
        let cells: Vec<String> = line
            .grades
            .iter()
            .map(|(scheme, grade)| format!("{scheme}={grade:.2}"))
            .collect();
        info!(participations = line.participations, "{}", cells.join("  "));
    }
}

/// Writes the raw participation table (no grades) to a CSV file, replacing it.
///
/// Besides the counts it carries the forum post/reply split, distinct topics
/// and conversations, the channel-usage label, and the first and last
/// counted activity (RFC 3339, UTC).
pub fn write_participation(path: impl AsRef<Path>, rows: &[ParticipationDetail]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new().from_writer(File::create(path)?);

    for row in rows {
        writer.serialize(ParticipationExport::from(row))?;
    }
    writer.flush()?;

    info!(path = %path.display(), records = rows.len(), "Participation data exported");
    Ok(())
}

/// Writes graded rows to a CSV file, replacing it.
///
/// Columns: `user_id, user_name, forum_count, message_count,
/// total_participations, activity_level, grade`. Rows are ordered by grade,
/// highest first; ties keep their input order.
pub fn write_grades(path: impl AsRef<Path>, rows: &[GradedRow]) -> Result<()> {
    let path = path.as_ref();
    let mut ordered: Vec<&GradedRow> = rows.iter().collect();
    ordered.sort_by(|a, b| b.grade.total_cmp(&a.grade));

    let mut writer = WriterBuilder::new().from_writer(File::create(path)?);
    for row in ordered {
        writer.serialize(GradeExport::from(row))?;
    }
    writer.flush()?;

    info!(path = %path.display(), records = rows.len(), "Graded data exported");
    Ok(())
}
