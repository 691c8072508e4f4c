//! Trait for retrieving raw course activity from a learning platform.

use anyhow::Result;
use chrono::{DateTime, Utc};
use participation_rater::activity::ActivityRecord;

/// Abstraction over an activity source (e.g., Canvas).
#[async_trait::async_trait]
pub trait ActivityApi {
    /// Every forum post and reply in the course.
    async fn forum_activity(&self, course_id: u64) -> Result<Vec<ActivityRecord>>;

    /// Every message in the course's conversations. Conversations whose last
    /// message predates `since` may be skipped without being fetched.
    async fn message_activity(
        &self,
        course_id: u64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>>;
}
