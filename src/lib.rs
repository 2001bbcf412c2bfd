//! Weighted grade averages and cohort pass-rate statistics.
//!
//! Grade records are fetched through a [`source::ScoreSource`], grouped by
//! learner or class, reduced to weighted averages and tallied against a pass
//! threshold.

pub mod cohort;
pub mod config;
pub mod db;
pub mod error;
pub mod grouping;
pub mod models;
pub mod report;
pub mod service;
pub mod source;
pub mod weighting;
