//! Track resolution against the search index

use crate::error::ResolutionError;
use crate::providers::SearchIndex;
use crate::ranking::select_best;
use crate::types::{ProviderId, Track};
use std::sync::Arc;

/// Resolves a [`Track`] to a provider id with one search query
#[derive(Clone)]
pub struct TrackResolver {
    search: Arc<dyn SearchIndex>,
    top_k: usize,
}

impl TrackResolver {
    /// Create a resolver that considers at most `top_k` results per query
    pub fn new(search: Arc<dyn SearchIndex>, top_k: usize) -> Self {
        Self { search, top_k }
    }

    /// Build the search query from the raw track fields
    pub fn query_for(track: &Track) -> String {
        format!("'{}' {} {}", track.title, track.artist, track.album)
    }

    /// Resolve `track`.
    ///
    /// `Ok(None)` means the query succeeded but no candidate was eligible; callers treat
    /// it differently from `Err`.
    pub async fn resolve(&self, track: &Track) -> Result<Option<ProviderId>, ResolutionError> {
        let query = Self::query_for(track);
        tracing::debug!(query = %query, index = self.search.name(), "querying search index");

        let mut candidates = self.search.query(&query).await?;
        candidates.truncate(self.top_k);

        match select_best(track, &candidates) {
            Some(best) => {
                tracing::debug!(
                    title = %track.title,
                    provider_id = %best.provider_id,
                    total = best.score.total,
                    "resolved track"
                );
                Ok(Some(best.provider_id))
            }
            None => Ok(None),
        }
    }
}
