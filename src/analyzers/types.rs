//! Data types produced by the aggregation and grading pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::analyzers::classify::{ActivityThresholds, classify};

/// Coarse label for how active a student was. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    None,
    Low,
    Moderate,
    High,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::None => "none",
            ActivityLevel::Low => "low",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::High => "high",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which channels a student used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelUsage {
    Both,
    ForumsOnly,
    MessagesOnly,
    None,
}

impl ChannelUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelUsage::Both => "both",
            ChannelUsage::ForumsOnly => "forums_only",
            ChannelUsage::MessagesOnly => "messages_only",
            ChannelUsage::None => "none",
        }
    }
}

impl fmt::Display for ChannelUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One student's aggregated participation.
///
/// `user_id` is `None` only for rows grouped by author name because the
/// underlying records carried no id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipationRow {
    pub user_id: Option<String>,
    pub user_name: String,
    pub forum_count: u32,
    pub message_count: u32,
    pub total_participations: u32,
    pub activity_level: ActivityLevel,
}

impl ParticipationRow {
    /// Builds a row from per-channel counts, deriving the total and the
    /// activity level so they can never disagree with the counts.
    pub fn new(
        user_id: Option<String>,
        user_name: String,
        forum_count: u32,
        message_count: u32,
        thresholds: &ActivityThresholds,
    ) -> Self {
        let total_participations = forum_count + message_count;
        Self {
            user_id,
            user_name,
            forum_count,
            message_count,
            total_participations,
            activity_level: classify(total_participations, thresholds),
        }
    }

    /// A roster student with no qualifying activity.
    pub fn zero(user_id: &str, user_name: &str, thresholds: &ActivityThresholds) -> Self {
        Self::new(
            Some(user_id.to_string()),
            user_name.to_string(),
            0,
            0,
            thresholds,
        )
    }

    pub fn channel_usage(&self) -> ChannelUsage {
        match (self.forum_count > 0, self.message_count > 0) {
            (true, true) => ChannelUsage::Both,
            (true, false) => ChannelUsage::ForumsOnly,
            (false, true) => ChannelUsage::MessagesOnly,
            (false, false) => ChannelUsage::None,
        }
    }
}

/// Descriptive extras for one aggregated row, kept for the raw participation
/// table only. Grading never looks at these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipationDetail {
    #[serde(flatten)]
    pub row: ParticipationRow,
    /// Top-level forum posts; `forum_count - forum_posts` are replies.
    pub forum_posts: u32,
    pub forum_replies: u32,
    /// Distinct forum topics posted in. Records without a thread id are not counted.
    pub forum_topics: usize,
    /// Distinct conversations written in. Records without a thread id are not counted.
    pub message_conversations: usize,
    pub communication_preference: ChannelUsage,
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// A [`ParticipationRow`] extended with its grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedRow {
    #[serde(flatten)]
    pub row: ParticipationRow,
    pub grade: f64,
}

/// Result of one aggregation pass.
///
/// Every input record lands in exactly one bucket, so
/// `channel_disabled + before_start + excluded + dropped_records + counted == records_seen`.
/// `details[i]` describes `rows[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    pub rows: Vec<ParticipationRow>,
    pub details: Vec<ParticipationDetail>,
    pub records_seen: usize,
    pub channel_disabled: usize,
    pub before_start: usize,
    pub excluded: usize,
    pub dropped_records: usize,
    pub counted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_row_keeps_total_consistent() {
        let row = ParticipationRow::new(
            Some("1".into()),
            "Ada".into(),
            3,
            2,
            &ActivityThresholds::default(),
        );
        assert_eq!(row.total_participations, 5);
        assert_eq!(row.activity_level, ActivityLevel::Moderate);
    }

    #[test]
    fn test_zero_row() {
        let row = ParticipationRow::zero("7", "Hopper, Grace", &ActivityThresholds::default());
        assert_eq!(row.total_participations, 0);
        assert_eq!(row.activity_level, ActivityLevel::None);
        assert_eq!(row.channel_usage(), ChannelUsage::None);
    }

    #[test]
    fn test_channel_usage() {
        let t = ActivityThresholds::default();
        let both = ParticipationRow::new(None, "a".into(), 1, 1, &t);
        let forums = ParticipationRow::new(None, "b".into(), 2, 0, &t);
        let messages = ParticipationRow::new(None, "c".into(), 0, 4, &t);
        assert_eq!(both.channel_usage(), ChannelUsage::Both);
        assert_eq!(forums.channel_usage(), ChannelUsage::ForumsOnly);
        assert_eq!(messages.channel_usage(), ChannelUsage::MessagesOnly);
        assert_eq!(both.channel_usage().to_string(), "both");
        assert_eq!(forums.channel_usage().to_string(), "forums_only");
    }
}
