//! Error types for trackdl
//!
//! This module provides the error taxonomy for the library:
//! - [`Error`] - the crate-wide error, returned by fallible public operations
//! - [`ResolutionError`] - the search-index query for a track failed
//! - [`FetchError`] - the audio stream could not be written to disk
//! - [`TagError`] - the external tagging step failed
//!
//! Per-track failures inside a batch are never returned as `Err`; the coordinator records
//! them as a [`FailureReason`](crate::types::FailureReason) on the job instead. Only
//! [`Error::InvalidDestination`] and filesystem failures that prevent a run from starting
//! abort the whole batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trackdl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trackdl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.workers")
        key: Option<String>,
    },

    /// Destination directory is missing or not a directory
    #[error("invalid destination {path}: {reason}")]
    InvalidDestination {
        /// The destination that was rejected
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// A URL list file was rejected before any lookup
    #[error("invalid URL list {path}: {reason}")]
    InvalidUrlList {
        /// The list file
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// The source catalog could not produce tracks for a URL
    #[error("catalog lookup failed for {url}: {reason}")]
    Catalog {
        /// The source URL
        url: String,
        /// Catalog-supplied reason
        reason: String,
    },

    /// Search-index query failed
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Audio fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Metadata tagging failed
    #[error("tag error: {0}")]
    Tag(#[from] TagError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Archive packaging failed
    #[error("archive error: {0}")]
    Archive(String),

    /// Local delivery server error
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Errors raised while querying the search index for a track
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The request never produced a response
    #[error("search query failed: {0}")]
    Query(String),

    /// The search index answered with a non-success status
    #[error("search index returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The response body could not be understood
    #[error("malformed search response: {0}")]
    Parse(String),
}

/// Errors raised while fetching an audio stream into a file
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider could not open a stream for the id
    #[error("failed to open stream for {provider_id}: {reason}")]
    Stream {
        /// Provider-specific audio id
        provider_id: String,
        /// Provider-supplied reason
        reason: String,
    },

    /// Writing the stream to disk failed
    #[error("I/O error while fetching: {0}")]
    Io(#[from] std::io::Error),

    /// A single attempt produced an empty file
    #[error("stream for {provider_id} was empty")]
    EmptyStream {
        /// Provider-specific audio id
        provider_id: String,
    },

    /// Every attempt produced an empty file
    #[error("stream for {provider_id} stayed empty after {attempts} attempts")]
    ZeroByteStall {
        /// Provider-specific audio id
        provider_id: String,
        /// Number of stream requests made
        attempts: u32,
    },
}

/// Errors raised while stamping metadata onto a fetched file
#[derive(Debug, Error)]
pub enum TagError {
    /// The file to tag does not exist or is empty
    #[error("nothing to tag at {path}")]
    MissingInput {
        /// The expected input file
        path: PathBuf,
    },

    /// The external tool could not be started
    #[error("failed to launch {tool}: {reason}")]
    Launch {
        /// Tool name or path
        tool: String,
        /// Launch failure
        reason: String,
    },

    /// The external tool exited unsuccessfully
    #[error("tagger exited with {}: {stderr}", describe_exit(.code))]
    Failed {
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard error (trimmed)
        stderr: String,
    },

    /// The tool reported success but wrote no output
    #[error("tagger produced no output at {path}")]
    MissingOutput {
        /// The expected output file
        path: PathBuf,
    },

    /// No tagging backend is available
    #[error("tagging not supported: {0}")]
    Unsupported(String),

    /// Filesystem error around the tagging step
    #[error("I/O error while tagging: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "signal".to_string(),
    }
}
