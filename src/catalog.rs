//! Source catalog ingestion
//!
//! The catalog itself (turning a share URL into track metadata) is an external
//! collaborator behind the [`Catalog`] trait. This module turns the three kinds of input
//! into a batch of [`Track`]s: a single track URL, a playlist or album URL, or a
//! newline-delimited `.txt` file of track URLs resolved in parallel.

use crate::error::{Error, Result};
use crate::types::Track;
use crate::utils::is_txt;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};

/// Source music catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up the track behind a single-track URL
    async fn track(&self, url: &str) -> Result<Track>;

    /// Expand a playlist or album URL into its tracks
    async fn collection(&self, url: &str) -> Result<Vec<Track>>;
}

/// What to ingest
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// One track URL
    Track(String),
    /// A playlist or album URL
    Collection(String),
    /// A `.txt` file with one track URL per line
    UrlList(PathBuf),
}

/// Produce the batch of tracks for `source`
///
/// `lookup_workers` bounds the catalog lookups in flight for a URL list.
pub async fn load_source(
    catalog: &dyn Catalog,
    source: &Source,
    lookup_workers: usize,
) -> Result<Vec<Track>> {
    match source {
        Source::Track(url) => Ok(vec![catalog.track(url).await?]),
        Source::Collection(url) => catalog.collection(url).await,
        Source::UrlList(path) => load_url_list(catalog, path, lookup_workers).await,
    }
}

/// Resolve every URL in a newline-delimited list file.
///
/// Blank lines are ignored. A line whose lookup fails is logged and skipped, so the
/// result may be shorter than the list. Result order is not guaranteed.
///
/// # Errors
///
/// [`Error::InvalidUrlList`] if the file is not a `.txt` file or holds no URLs, and
/// [`Error::Io`] if it cannot be read.
pub async fn load_url_list(
    catalog: &dyn Catalog,
    path: &Path,
    lookup_workers: usize,
) -> Result<Vec<Track>> {
    if !is_txt(path) {
        return Err(Error::InvalidUrlList {
            path: path.to_path_buf(),
            reason: "expected a .txt file".into(),
        });
    }

    let contents = tokio::fs::read_to_string(path).await?;
    let urls: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(Error::InvalidUrlList {
            path: path.to_path_buf(),
            reason: "file contains no URLs".into(),
        });
    }

    tracing::info!(
        path = %path.display(),
        urls = urls.len(),
        workers = lookup_workers,
        "resolving URL list"
    );

    let lookups: Vec<(&str, Result<Track>)> = futures::stream::iter(urls)
        .map(|url| async move { (url, catalog.track(url).await) })
        .buffer_unordered(lookup_workers.max(1))
        .collect()
        .await;

    let mut tracks = Vec::with_capacity(lookups.len());
    for (url, result) in lookups {
        match result {
            Ok(track) => tracks.push(track),
            Err(e) => tracing::warn!(url = url, error = %e, "skipping URL"),
        }
    }
    Ok(tracks)
}
