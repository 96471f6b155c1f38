//! Audio fetching with bounded zero-byte retry
//!
//! Each fetch reserves its own scratch file next to the destination
//! (`.<name>.<random>.part`) and every attempt rewrites it from a fresh stream. An empty
//! result is retried with backoff per [`RetryConfig`]; any other failure ends the fetch
//! immediately. The scratch file is renamed onto the destination only once it holds
//! data, so two fetches racing for one destination each land whole or not at all.

use crate::config::RetryConfig;
use crate::error::FetchError;
use crate::providers::AudioProvider;
use crate::retry::with_retry;
use crate::types::ProviderId;
use crate::utils::{discard_temp, sibling_temp};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Writes resolved audio streams to disk
#[derive(Clone)]
pub struct AudioFetcher {
    provider: Arc<dyn AudioProvider>,
    retry: RetryConfig,
}

impl AudioFetcher {
    /// Create a fetcher over `provider` using the given retry policy
    pub fn new(provider: Arc<dyn AudioProvider>, retry: RetryConfig) -> Self {
        Self { provider, retry }
    }

    /// Fetch `provider_id` into `destination`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Stream`] if the provider cannot open a stream
    /// - [`FetchError::Io`] if the scratch file cannot be created, written or renamed
    /// - [`FetchError::ZeroByteStall`] if every attempt produced an empty file
    pub async fn fetch(&self, provider_id: &ProviderId, destination: &Path) -> Result<u64, FetchError> {
        let partial = partial_file(destination)?;
        let partial_ref: &Path = &partial;
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;

        let result = with_retry(&self.retry, move || {
            attempts_ref.fetch_add(1, Ordering::Relaxed);
            self.attempt(provider_id, partial_ref)
        })
        .await;

        match result {
            Ok(size) => {
                // A failed persist hands the path back inside the error and drops it there
                partial
                    .persist(destination)
                    .map_err(|e| FetchError::Io(e.error))?;
                tracing::debug!(
                    provider_id = %provider_id,
                    bytes = size,
                    attempts = attempts.load(Ordering::Relaxed),
                    "stream written"
                );
                Ok(size)
            }
            Err(FetchError::EmptyStream { provider_id }) => {
                discard_temp(partial);
                Err(FetchError::ZeroByteStall {
                    provider_id,
                    attempts: attempts.load(Ordering::Relaxed),
                })
            }
            Err(e) => {
                discard_temp(partial);
                Err(e)
            }
        }
    }

    async fn attempt(&self, provider_id: &ProviderId, partial: &Path) -> Result<u64, FetchError> {
        let mut stream = self.provider.open_stream(provider_id).await?;

        // Truncates whatever an earlier empty attempt left behind
        let mut file = tokio::fs::File::create(partial).await?;
        tokio::io::copy(&mut stream, &mut file).await?;
        file.flush().await?;

        let size = file.metadata().await?.len();
        if size == 0 {
            return Err(FetchError::EmptyStream {
                provider_id: provider_id.to_string(),
            });
        }
        Ok(size)
    }
}

fn partial_file(destination: &Path) -> Result<TempPath, FetchError> {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    sibling_temp(destination, &format!(".{name}."), ".part").map_err(FetchError::Io)
}
