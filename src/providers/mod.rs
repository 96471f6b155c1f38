//! Collaborator interfaces for the search index and the audio provider
//!
//! The coordinator only talks to these traits, which keeps the pipeline testable with
//! in-memory doubles. HTTP-backed implementations live in [`http`].
//!
//! - [`SearchIndex`]: turns a text query into ranked raw candidates
//! - [`AudioProvider`]: turns a provider id into a byte stream

mod http;

pub use http::{HttpAudioProvider, HttpSearchIndex};

use crate::error::{FetchError, ResolutionError};
use crate::types::{Candidate, ProviderId};
use async_trait::async_trait;
use tokio::io::AsyncRead;

/// Byte stream of audio content
pub type AudioStream = Box<dyn AsyncRead + Send + Unpin>;

/// Text search over the audio-streaming catalog
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Run `text` as a query, returning raw candidates in the index's ranking order
    async fn query(&self, text: &str) -> Result<Vec<Candidate>, ResolutionError>;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}

/// Source of audio bytes for a resolved id
///
/// May be asked for the same id several times during one fetch when a previous stream
/// came back empty.
#[async_trait]
pub trait AudioProvider: Send + Sync {
    /// Open a fresh stream for `provider_id`
    async fn open_stream(&self, provider_id: &ProviderId) -> Result<AudioStream, FetchError>;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}
