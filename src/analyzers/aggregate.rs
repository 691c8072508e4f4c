use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::activity::{ActivityRecord, Channel, start_of_day};
use crate::analyzers::classify::ActivityThresholds;
use crate::analyzers::types::{Aggregation, ParticipationDetail, ParticipationRow};

/// Filters applied while aggregating.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub professor_ids: HashSet<String>,
    /// Matched case-insensitively against `author_name`.
    pub professor_names: Vec<String>,
    /// Inclusive: records at 00:00 UTC on this date are kept.
    pub start_date: Option<NaiveDate>,
    pub include_forums: bool,
    pub include_messages: bool,
    pub thresholds: ActivityThresholds,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            professor_ids: HashSet::new(),
            professor_names: Vec::new(),
            start_date: None,
            include_forums: true,
            include_messages: true,
            thresholds: ActivityThresholds::default(),
        }
    }
}

impl AggregateOptions {
    fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Forum => self.include_forums,
            Channel::Message => self.include_messages,
        }
    }
}

/// Records are grouped by author id; only records without an id fall back to
/// the author name. The two key spaces never merge, so an id-less record by
/// "Ada" is not attributed to the id-carrying "Ada".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Id(String),
    Name(String),
}

struct Group {
    user_id: Option<String>,
    user_name: Option<String>,
    forum_count: u32,
    message_count: u32,
    forum_replies: u32,
    topics: HashSet<String>,
    conversations: HashSet<String>,
    first_activity: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Group {
    fn new(record: &ActivityRecord) -> Self {
        Self {
            user_id: record.author_id.clone(),
            user_name: None,
            forum_count: 0,
            message_count: 0,
            forum_replies: 0,
            topics: HashSet::new(),
            conversations: HashSet::new(),
            first_activity: record.timestamp,
            last_activity: record.timestamp,
        }
    }

    fn add(&mut self, record: &ActivityRecord) {
        if self.user_name.is_none() {
            self.user_name = record.author_name.clone();
        }
        self.first_activity = self.first_activity.min(record.timestamp);
        self.last_activity = self.last_activity.max(record.timestamp);

        let threads = match record.channel {
            Channel::Forum => {
                self.forum_count += 1;
                if record.reply {
                    self.forum_replies += 1;
                }
                &mut self.topics
            }
            Channel::Message => {
                self.message_count += 1;
                &mut self.conversations
            }
        };
        if let Some(thread) = &record.thread_id {
            threads.insert(thread.clone());
        }
    }

    fn into_detail(self, thresholds: &ActivityThresholds) -> ParticipationDetail {
        let row = ParticipationRow::new(
            self.user_id,
            self.user_name.unwrap_or_default(),
            self.forum_count,
            self.message_count,
            thresholds,
        );
        ParticipationDetail {
            communication_preference: row.channel_usage(),
            forum_posts: self.forum_count - self.forum_replies,
            forum_replies: self.forum_replies,
            forum_topics: self.topics.len(),
            message_conversations: self.conversations.len(),
            first_activity: self.first_activity,
            last_activity: self.last_activity,
            row,
        }
    }
}

/// Collapses activity records into one [`ParticipationRow`] per author.
///
/// Filters run in a fixed order: disabled channel, before `start_date`,
/// professor (by id, then by case-insensitive name). Records with neither an
/// id nor a name are skipped and counted in `dropped_records`. Rows come out
/// in order of each author's first counted record.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn aggregate(records: &[ActivityRecord], options: &AggregateOptions) -> Aggregation {
    let window_start = options.start_date.map(start_of_day);
    let professor_names: HashSet<String> = options
        .professor_names
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut outcome = Aggregation {
        records_seen: records.len(),
        ..Default::default()
    };
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for record in records {
        if !options.channel_enabled(record.channel) {
            outcome.channel_disabled += 1;
            continue;
        }

        if let Some(start) = window_start {
            if record.timestamp < start {
                outcome.before_start += 1;
                continue;
            }
        }

        let id_match = record
            .author_id
            .as_ref()
            .is_some_and(|id| options.professor_ids.contains(id));
        let name_match = record
            .author_name
            .as_ref()
            .is_some_and(|name| professor_names.contains(&name.trim().to_lowercase()));
        if id_match || name_match {
            outcome.excluded += 1;
            continue;
        }

        let key = match (&record.author_id, &record.author_name) {
            (Some(id), _) => GroupKey::Id(id.clone()),
            (None, Some(name)) => GroupKey::Name(name.clone()),
            (None, None) => {
                outcome.dropped_records += 1;
                continue;
            }
        };

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group::new(record));
            groups.len() - 1
        });
        groups[slot].add(record);
        outcome.counted += 1;
    }

    outcome.details = groups
        .into_iter()
        .map(|g| g.into_detail(&options.thresholds))
        .collect();
    outcome.rows = outcome.details.iter().map(|d| d.row.clone()).collect();

    if outcome.dropped_records > 0 {
        warn!(
            dropped = outcome.dropped_records,
            "Skipped activity records with neither author id nor name"
        );
    }

    if outcome.rows.is_empty() {
        warn!(
            records = records.len(),
            "No activity records survived filtering"
        );
    }

    debug!(
        rows = outcome.rows.len(),
        counted = outcome.counted,
        channel_disabled = outcome.channel_disabled,
        before_start = outcome.before_start,
        excluded = outcome.excluded,
        "Aggregation complete"
    );

    outcome
}
