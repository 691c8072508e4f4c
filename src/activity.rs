//! Raw activity records: one forum post or message by one author.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{RaterError, Result};

/// The course channel an activity record was produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Forum,
    Message,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Forum => "forum",
            Channel::Message => "message",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = RaterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forum" | "forums" => Ok(Channel::Forum),
            "message" | "messages" => Ok(Channel::Message),
            other => Err(RaterError::InvalidRecord(format!(
                "unknown channel '{other}'"
            ))),
        }
    }
}

/// One timestamped contribution.
///
/// Either `author_id` or `author_name` is needed to attribute the record;
/// records with neither are skipped (and counted) by the aggregator.
///
/// `thread_id` names the forum topic or conversation the record belongs to,
/// and `reply` marks forum replies as opposed to top-level posts. Neither
/// affects grading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub channel: Channel,
    pub thread_id: Option<String>,
    pub reply: bool,
}

impl ActivityRecord {
    pub fn forum(author_id: &str, author_name: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(author_id, author_name, timestamp, Channel::Forum)
    }

    pub fn message(author_id: &str, author_name: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(author_id, author_name, timestamp, Channel::Message)
    }

    fn new(author_id: &str, author_name: &str, timestamp: DateTime<Utc>, channel: Channel) -> Self {
        Self {
            author_id: non_empty(author_id),
            author_name: non_empty(author_name),
            timestamp,
            channel,
            thread_id: None,
            reply: false,
        }
    }

    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = non_empty(&thread_id.into());
        self
    }

    pub fn as_reply(mut self) -> Self {
        self.reply = true;
        self
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a record timestamp.
///
/// Accepts RFC 3339 (`2025-02-20T14:03:11Z`, with any offset) and the naive
/// forms `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS`, which are read as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(RaterError::DateParse {
        input: input.to_string(),
        reason: "expected RFC 3339 or YYYY-MM-DD[T ]HH:MM:SS".to_string(),
    })
}

/// Parses an inclusive start date in `YYYY-MM-DD` form.
pub fn parse_start_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|e| RaterError::DateParse {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// First instant of `date` in UTC; records at or after it are in the window.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Deserialize)]
struct RecordRow {
    author_id: Option<String>,
    author_name: Option<String>,
    timestamp: String,
    channel: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    reply: Option<bool>,
}

/// Loads activity records from a CSV file with the header
/// `author_id,author_name,timestamp,channel`, optionally followed by
/// `thread_id,reply`.
///
/// A malformed timestamp or unknown channel fails the whole load.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<ActivityRecord>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut records = Vec::new();

    for result in rdr.deserialize() {
        let row: RecordRow = result?;
        records.push(ActivityRecord {
            author_id: row.author_id.as_deref().and_then(non_empty),
            author_name: row.author_name.as_deref().and_then(non_empty),
            timestamp: parse_timestamp(&row.timestamp)?,
            channel: row.channel.parse()?,
            thread_id: row.thread_id.as_deref().and_then(non_empty),
            reply: row.reply.unwrap_or(false),
        });
    }

    debug!(path = %path.display(), records = records.len(), "Activity records loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::env;
    use std::fs;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let ts = parse_timestamp("2025-02-20T14:03:11Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 2, 20, 14, 3, 11).unwrap());
    }

    #[test]
    fn test_parse_timestamp_with_offset_normalizes_to_utc() {
        let ts = parse_timestamp("2025-02-20T09:00:00-05:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 2, 20, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-01T08:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-03-01 08:30:00").unwrap(), expected);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, RaterError::DateParse { .. }));
    }

    #[test]
    fn test_parse_start_date() {
        let date = parse_start_date("2025-02-15").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 2, 15).unwrap());
        assert!(matches!(
            parse_start_date("15/02/2025"),
            Err(RaterError::DateParse { .. })
        ));
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("Forum".parse::<Channel>().unwrap(), Channel::Forum);
        assert_eq!("messages".parse::<Channel>().unwrap(), Channel::Message);
        assert!("email".parse::<Channel>().is_err());
    }

    #[test]
    fn test_constructor_blanks_become_none() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 20, 0, 0, 0).unwrap();
        let record = ActivityRecord::forum("  ", "Ada", ts);
        assert_eq!(record.author_id, None);
        assert_eq!(record.author_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_load_records() {
        let path = format!("{}/participation_rater_records.csv", env::temp_dir().display());
        fs::write(
            &path,
            "author_id,author_name,timestamp,channel\n\
             1,\"Lovelace, Ada\",2025-02-20T10:00:00Z,forum\n\
             ,Grace Hopper,2025-02-21T10:00:00Z,message\n",
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].author_id.as_deref(), Some("1"));
        assert_eq!(records[0].author_name.as_deref(), Some("Lovelace, Ada"));
        assert_eq!(records[1].author_id, None);
        assert_eq!(records[1].channel, Channel::Message);
        assert_eq!(records[1].thread_id, None);
        assert!(!records[1].reply);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_records_with_thread_columns() {
        let path = format!("{}/participation_rater_threads.csv", env::temp_dir().display());
        fs::write(
            &path,
            "author_id,author_name,timestamp,channel,thread_id,reply\n\
             1,Ada,2025-02-20T10:00:00Z,forum,topic-7,true\n\
             2,Grace,2025-02-21T10:00:00Z,message,,\n",
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records[0].thread_id.as_deref(), Some("topic-7"));
        assert!(records[0].reply);
        assert_eq!(records[1].thread_id, None);
        assert!(!records[1].reply);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_records_fails_on_bad_timestamp() {
        let path = format!("{}/participation_rater_bad_ts.csv", env::temp_dir().display());
        fs::write(
            &path,
            "author_id,author_name,timestamp,channel\n1,Ada,not-a-date,forum\n",
        )
        .unwrap();

        assert!(matches!(
            load_records(&path),
            Err(RaterError::DateParse { .. })
        ));

        fs::remove_file(&path).unwrap();
    }
}
