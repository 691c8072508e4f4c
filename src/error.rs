//! Error type shared by the aggregation and grading pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RaterError>;

#[derive(Debug, Error)]
pub enum RaterError {
    #[error("unknown grading scheme '{name}' (available: {available})")]
    UnknownScheme { name: String, available: String },

    #[error("roster lists user id '{user_id}' more than once")]
    DuplicateIdentity { user_id: String },

    #[error("could not parse date '{input}': {reason}")]
    DateParse { input: String, reason: String },

    #[error("invalid grading bounds: {0}")]
    InvalidBounds(String),

    #[error("invalid activity record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
