//! Typed errors for twnews.
//!
//! Only [`SearchError`] and [`ConfigError`] ever reach library callers.
//! The other errors describe why a page or document could not be produced;
//! they are logged at the boundary where they happen and turned into
//! `None` / empty results, because news sites break all the time and an
//! extraction run should degrade rather than abort.

use thiserror::Error;

/// Invalid search parameters, detected by `NewsSearch::new` before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The channel key has no configuration entry.
    #[error("unknown channel: {channel}")]
    UnknownChannel { channel: String },

    /// The channel is configured but does not offer keyword search.
    #[error("channel {channel} does not support search")]
    SearchUnsupported { channel: String },

    /// The channel search endpoint cannot be filtered by date.
    #[error("channel {channel} does not support date range conditions")]
    DateRangeUnsupported { channel: String },

    #[error("begin date is missing (end date is {end})")]
    MissingBeginDate { end: String },

    #[error("end date is missing (begin date is {begin})")]
    MissingEndDate { begin: String },

    /// Dates must be given as `yyyy-mm-dd`.
    #[error("date must be in ISO format (yyyy-mm-dd): {value}")]
    InvalidDate { value: String },

    #[error("begin date {begin} is after end date {end}")]
    ReversedRange { begin: String, end: String },

    #[error("channel {channel} only accepts date ranges within {max_days} days (got {days})")]
    SpanTooLong {
        channel: String,
        max_days: i64,
        days: i64,
    },
}

/// Failure of the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

/// Why a document could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is empty")]
    Empty,

    #[error("malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The channel configuration document could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read channel configuration {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed channel configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("channel {channel} has no {layout} layout")]
    MissingLayout { channel: String, layout: String },

    #[error("channel {channel} has an invalid pattern {pattern:?}: {source}")]
    Pattern {
        channel: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Why the binary-search page jump could not pick a starting page.
///
/// The search falls back to a linear scan from page 1 on any of these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JumpError {
    #[error("cannot read the total page count")]
    NoPageCount,

    #[error("result page {page} could not be fetched: {reason}")]
    Fetch { page: u32, reason: String },

    #[error("result page {page} has no dated results")]
    Undated { page: u32 },

    /// Results are not sorted newest first, so any page picked by bisection
    /// could be wrong.
    #[error("result page {page} is not sorted newest first")]
    NonMonotonic { page: u32 },
}
