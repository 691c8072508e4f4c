use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use participation_rater::activity::{ActivityRecord, Channel, parse_timestamp};
use participation_rater::fetch::auth::ApiKey;
use participation_rater::fetch::{BasicClient, HttpClient, RetryPolicy, fetch_json};
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::services::activity_api::ActivityApi;

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct Topic {
    id: u64,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: u64,
    user_id: Option<u64>,
    user_name: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    recent_replies: Vec<Entry>,
    #[serde(default)]
    replies: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Conversation {
    id: u64,
    last_message_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationDetail {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    participants: Vec<Participant>,
}

#[derive(Debug, Deserialize)]
struct Message {
    author_id: Option<u64>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Participant {
    id: u64,
    name: Option<String>,
}

/// Canvas LMS REST client.
///
/// Lists are fetched `PER_PAGE` items at a time until a short page comes back.
pub struct CanvasClient<C> {
    base_url: String,
    http: C,
    retry: RetryPolicy,
}

impl CanvasClient<ApiKey<BasicClient>> {
    /// Creates a client that authenticates with a Canvas access token.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = ApiKey::bearer(BasicClient::new()?, token)?;
        Ok(Self::with_http(base_url, http, RetryPolicy::default()))
    }
}

impl<C: HttpClient> CanvasClient<C> {
    pub fn with_http(base_url: &str, http: C, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            retry,
        }
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("invalid Canvas URL for '{path}'"))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1usize;

        loop {
            let mut params = query.to_vec();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));
            let url = self.url(path, &params)?;

            let batch: Vec<T> = fetch_json(&self.http, url.as_str(), &self.retry).await?;
            let len = batch.len();
            debug!(path, page, len, "Fetched page");
            items.extend(batch);

            if len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl<C: HttpClient> ActivityApi for CanvasClient<C> {
    #[tracing::instrument(skip(self))]
    async fn forum_activity(&self, course_id: u64) -> Result<Vec<ActivityRecord>> {
        let topics: Vec<Topic> = self
            .get_pages(&format!("/courses/{course_id}/discussion_topics"), &[])
            .await?;

        let mut records = Vec::new();
        for topic in &topics {
            let entries: Vec<Entry> = self
                .get_pages(
                    &format!("/courses/{course_id}/discussion_topics/{}/entries", topic.id),
                    &[],
                )
                .await?;

            let before = records.len();
            let mut seen = HashSet::new();
            collect_entries(&entries, topic.id, false, &mut seen, &mut records)?;
            debug!(
                topic_id = topic.id,
                title = topic.title.as_deref().unwrap_or(""),
                records = records.len() - before,
                "Topic processed"
            );
        }

        info!(topics = topics.len(), records = records.len(), "Forum activity fetched");
        Ok(records)
    }

    #[tracing::instrument(skip(self))]
    async fn message_activity(
        &self,
        course_id: u64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>> {
        let conversations: Vec<Conversation> = self
            .get_pages(
                "/conversations",
                &[("filter[]", format!("course_{course_id}"))],
            )
            .await?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for conversation in &conversations {
            if let (Some(since), Some(last)) = (since, conversation.last_message_at.as_deref()) {
                if parse_timestamp(last)? < since {
                    skipped += 1;
                    continue;
                }
            }

            let url = self.url(&format!("/conversations/{}", conversation.id), &[])?;
            let detail: ConversationDetail =
                fetch_json(&self.http, url.as_str(), &self.retry).await?;
            records.extend(conversation_records(conversation.id, &detail)?);
        }

        info!(
            conversations = conversations.len(),
            skipped,
            records = records.len(),
            "Message activity fetched"
        );
        Ok(records)
    }
}

/// Flattens entries and their nested replies into forum records.
///
/// Canvas may list the same reply under both `recent_replies` and `replies`,
/// so entries are counted once per id.
fn collect_entries(
    entries: &[Entry],
    topic_id: u64,
    replies: bool,
    seen: &mut HashSet<u64>,
    out: &mut Vec<ActivityRecord>,
) -> participation_rater::error::Result<()> {
    for entry in entries {
        if seen.insert(entry.id) {
            match entry.created_at.as_deref() {
                Some(created_at) => out.push(ActivityRecord {
                    author_id: entry.user_id.map(|id| id.to_string()),
                    author_name: entry.user_name.clone().filter(|n| !n.trim().is_empty()),
                    timestamp: parse_timestamp(created_at)?,
                    channel: Channel::Forum,
                    thread_id: Some(topic_id.to_string()),
                    reply: replies,
                }),
                None => warn!(entry_id = entry.id, "Forum entry without created_at skipped"),
            }
        }
        collect_entries(&entry.recent_replies, topic_id, true, seen, out)?;
        collect_entries(&entry.replies, topic_id, true, seen, out)?;
    }
    Ok(())
}

/// One message record per authored message, named through the participant list.
fn conversation_records(
    conversation_id: u64,
    detail: &ConversationDetail,
) -> participation_rater::error::Result<Vec<ActivityRecord>> {
    let mut records = Vec::with_capacity(detail.messages.len());
    for message in &detail.messages {
        let (Some(author_id), Some(created_at)) = (message.author_id, message.created_at.as_deref())
        else {
            continue;
        };
        let author_name = detail
            .participants
            .iter()
            .find(|p| p.id == author_id)
            .and_then(|p| p.name.clone());

        records.push(ActivityRecord {
            author_id: Some(author_id.to_string()),
            author_name,
            timestamp: parse_timestamp(created_at)?,
            channel: Channel::Message,
            thread_id: Some(conversation_id.to_string()),
            reply: false,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use participation_rater::error::RaterError;

    #[test]
    fn test_collect_entries_flattens_and_dedups_replies() {
        let entries: Vec<Entry> = serde_json::from_str(
            r#"[
                {
                    "id": 1, "user_id": 10, "user_name": "Ada", "created_at": "2025-03-01T10:00:00Z",
                    "recent_replies": [
                        {"id": 2, "user_id": 11, "user_name": "Grace", "created_at": "2025-03-01T11:00:00Z"}
                    ],
                    "replies": [
                        {"id": 2, "user_id": 11, "user_name": "Grace", "created_at": "2025-03-01T11:00:00Z"},
                        {"id": 3, "user_id": 10, "user_name": "Ada", "created_at": "2025-03-02T09:00:00Z",
                         "replies": [
                            {"id": 4, "user_id": 12, "user_name": "Edsger", "created_at": "2025-03-03T09:00:00Z"}
                         ]}
                    ]
                },
                {"id": 5, "user_id": 13, "user_name": "Barbara"}
            ]"#,
        )
        .unwrap();

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        collect_entries(&entries, 7, false, &mut seen, &mut records).unwrap();

        let ids: Vec<_> = records
            .iter()
            .map(|r| r.author_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["10", "11", "10", "12"]);
        assert!(records.iter().all(|r| r.channel == Channel::Forum));
        assert!(records.iter().all(|r| r.thread_id.as_deref() == Some("7")));
        let replies: Vec<_> = records.iter().map(|r| r.reply).collect();
        assert_eq!(replies, vec![false, true, true, true]);
    }

    #[test]
    fn test_collect_entries_rejects_bad_timestamp() {
        let entries: Vec<Entry> = serde_json::from_str(
            r#"[{"id": 1, "user_id": 10, "user_name": "Ada", "created_at": "last tuesday"}]"#,
        )
        .unwrap();
        let result = collect_entries(&entries, 1, false, &mut HashSet::new(), &mut Vec::new());
        assert!(matches!(result, Err(RaterError::DateParse { .. })));
    }

    #[test]
    fn test_conversation_records_resolve_names() {
        let detail: ConversationDetail = serde_json::from_str(
            r#"{
                "messages": [
                    {"author_id": 10, "created_at": "2025-03-02T09:00:00Z"},
                    {"author_id": 99, "created_at": "2025-03-01T09:00:00Z"},
                    {"author_id": 42, "created_at": "2025-03-01T08:00:00Z"},
                    {"created_at": "2025-03-01T07:00:00Z"}
                ],
                "participants": [
                    {"id": 10, "name": "Ada"},
                    {"id": 99, "name": "Professor Plum"}
                ]
            }"#,
        )
        .unwrap();

        let records = conversation_records(31, &detail).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.thread_id.as_deref() == Some("31")));
        assert_eq!(records[0].author_name.as_deref(), Some("Ada"));
        assert_eq!(records[1].author_name.as_deref(), Some("Professor Plum"));
        assert_eq!(records[2].author_name, None);
        assert!(records.iter().all(|r| r.channel == Channel::Message));
    }

    #[test]
    fn test_url_building() {
        let client = CanvasClient::with_http(
            "https://canvas.example.edu/api/v1/",
            BasicClient::new().unwrap(),
            RetryPolicy::default(),
        );
        let url = client
            .url("/conversations", &[("page", "2".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://canvas.example.edu/api/v1/conversations?page=2"
        );
    }
}
