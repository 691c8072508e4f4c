//! Participation aggregation and grading.
//!
//! This module collapses raw activity records into one row per student,
//! classifies activity levels, maps participation counts to grades through
//! interchangeable schemes, and merges in the course roster.

pub mod aggregate;
pub mod analyzer;
pub mod apply;
pub mod classify;
pub mod grade;
pub mod summary;
pub mod types;
pub mod utility;
