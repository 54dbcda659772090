// src/error.rs
//! Typed errors for the pure core. Plumbing (config, files, delivery) uses
//! `anyhow` with context instead.

use thiserror::Error;

/// A snapshot line or block that could not be decoded. Always recoverable:
/// the parser skips the offending line and keeps the rest of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: title is empty after stripping tags: {text:?}")]
    EmptyTitle { line: usize, text: String },

    #[error("line {line}: rank {rank:?} is out of range")]
    BadRank { line: usize, rank: String },

    #[error("line {line}: block header is empty")]
    EmptyHeader { line: usize },
}

impl ParseError {
    /// 1-based line number inside the snapshot text.
    pub fn line(&self) -> usize {
        match self {
            ParseError::EmptyTitle { line, .. }
            | ParseError::BadRank { line, .. }
            | ParseError::EmptyHeader { line } => *line,
        }
    }
}

/// Invalid values in the application or keyword configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown report mode {0:?} (expected daily, incremental or current)")]
    UnknownMode(String),

    #[error("invalid push window time {0:?} (expected HH:MM)")]
    BadWindowTime(String),

    #[error("keyword rules file {0} not found")]
    MissingKeywords(String),

    #[error("batch_send_interval_secs must be a finite number of seconds, got {0}")]
    BadBatchInterval(f64),
}

/// A channel refused or failed a payload.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{channel} batch {index}/{total}: HTTP {status}")]
    Status {
        channel: &'static str,
        index: usize,
        total: usize,
        status: u16,
    },

    #[error("{channel} batch {index}/{total}: rejected: {message}")]
    Rejected {
        channel: &'static str,
        index: usize,
        total: usize,
        message: String,
    },
}
