//! Configuration types for trackdl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Download behavior configuration (concurrency, output naming)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Number of concurrent download workers (default: 5)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Extension of the audio container written to disk (default: "m4a")
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            file_extension: default_file_extension(),
        }
    }
}

/// Candidate resolution configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Number of search results considered per query (default: 2)
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// Audio fetch configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Retry policy for empty streams
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration for transient failures
///
/// `max_attempts` counts retries after the first attempt, so an operation is tried at
/// most `max_attempts + 1` times.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500 milliseconds)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 8 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Catalog ingestion configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Maximum catalog lookups in flight when loading a URL list (default: 10)
    #[serde(default = "default_lookup_workers")]
    pub lookup_workers: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            lookup_workers: default_lookup_workers(),
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// HTTP collaborator endpoints
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Search endpoint, queried as `search_url?q=<query>`
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Stream endpoint, fetched as `stream_url/<id>`
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Request timeout (default: 30 seconds)
    ///
    /// A total deadline for search queries. For audio streams it bounds connecting and
    /// waiting for response headers only, never the body transfer.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            stream_url: default_stream_url(),
            timeout: default_request_timeout(),
        }
    }
}

/// Mobile delivery configuration (working directory, archive, local server)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MobileConfig {
    /// Address the local server binds to (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Name of the transient working directory (default: "YourMusic")
    #[serde(default = "default_working_dir_name")]
    pub working_dir_name: String,

    /// Name of the archive served to the device (default: "YourMusic.zip")
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for MobileConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            working_dir_name: default_working_dir_name(),
            archive_name: default_archive_name(),
        }
    }
}

/// Main configuration
///
/// Every section has defaults, so `Config::default()` is a working configuration and a
/// partial JSON document deserializes with the missing fields filled in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool and output naming
    #[serde(default)]
    pub download: DownloadConfig,

    /// Candidate resolution
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Audio fetching
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Catalog ingestion
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// HTTP collaborator endpoints
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Mobile delivery
    #[serde(default)]
    pub mobile: MobileConfig,
}

impl Config {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.workers == 0 {
            return Err(Error::config(
                "download.workers",
                "at least one worker is required",
            ));
        }
        if self.download.file_extension.trim_start_matches('.').is_empty() {
            return Err(Error::config(
                "download.file_extension",
                "file extension must not be empty",
            ));
        }
        if self.resolver.top_k == 0 {
            return Err(Error::config(
                "resolver.top_k",
                "at least one candidate must be considered",
            ));
        }
        if self.catalog.lookup_workers == 0 {
            return Err(Error::config(
                "catalog.lookup_workers",
                "at least one lookup worker is required",
            ));
        }
        if self.mobile.archive_name.is_empty() || self.mobile.working_dir_name.is_empty() {
            return Err(Error::config(
                "mobile",
                "working directory and archive names must not be empty",
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_workers() -> usize {
    5
}

fn default_file_extension() -> String {
    "m4a".into()
}

fn default_top_k() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(8)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_lookup_workers() -> usize {
    10
}

fn default_search_url() -> String {
    "http://127.0.0.1:8090/search".into()
}

fn default_stream_url() -> String {
    "http://127.0.0.1:8090/stream".into()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_working_dir_name() -> String {
    "YourMusic".into()
}

fn default_archive_name() -> String {
    "YourMusic.zip".into()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond-precision variant for short retry delays
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
