//! # trackdl
//!
//! Library for resolving music-catalog tracks to audio streams and downloading them,
//! tagged, with bounded parallelism.
//!
//! ## Design Philosophy
//!
//! trackdl is designed to be:
//! - **Best-effort** - Fuzzy matching picks the most plausible stream; one bad track never
//!   sinks the batch
//! - **Sensible defaults** - Works out of the box with `Config::default()`
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to job events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use trackdl::{Config, DownloadCoordinator, Track};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = DownloadCoordinator::from_config(&Config::default())?;
//!
//!     // Cancel in-flight runs on Ctrl+C / SIGTERM
//!     tokio::spawn(trackdl::shutdown_on_signal(coordinator.cancellation_token()));
//!
//!     let tracks = vec![
//!         Track::new("Unfinished Sympathy", "Massive Attack", "Blue Lines"),
//!         Track::new("Hyperballad", "Björk", "Post"),
//!     ];
//!     let summary = coordinator.run(tracks, Path::new("/music")).await?;
//!
//!     for failure in summary.failures() {
//!         eprintln!("skipped {}: {:?}", failure.track, failure.failure());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive packaging for mobile delivery
pub mod archive;
/// Source catalog ingestion
pub mod catalog;
/// Configuration types
pub mod config;
/// Batch download coordinator
pub mod coordinator;
/// Desktop and mobile delivery flows
pub mod delivery;
/// Error types
pub mod error;
/// Audio fetching
pub mod fetcher;
/// Text normalization and similarity
pub mod normalize;
/// Search index and audio provider collaborators
pub mod providers;
/// Candidate ranking
pub mod ranking;
/// Track resolution
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Filename sanitization
pub mod sanitize;
/// Local archive server
pub mod server;
/// Metadata tagging
pub mod tagging;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

pub use archive::{ArchivePackager, ZipPackager};
pub use catalog::{Catalog, Source, load_source, load_url_list};
pub use config::Config;
pub use coordinator::DownloadCoordinator;
pub use delivery::{MobileDelivery, TransientWorkspace, run_desktop};
pub use error::{Error, FetchError, ResolutionError, Result, TagError};
pub use fetcher::AudioFetcher;
pub use providers::{AudioProvider, HttpAudioProvider, HttpSearchIndex, SearchIndex};
pub use resolver::TrackResolver;
pub use server::LocalServer;
pub use tagging::{FfmpegTagger, MetadataTagger, NoOpTagger, TagWriter};
pub use types::{
    Candidate, DownloadJob, Event, FailureReason, JobOutcome, JobStatus, MatchScore, ProviderId,
    Summary, Track,
};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives SIGINT or SIGTERM (Ctrl+C elsewhere)
///
/// Spawn this next to a run; coordinators and delivery flows sharing the token stop at
/// their next job step and clean up.
pub async fn shutdown_on_signal(token: CancellationToken) {
    wait_for_signal().await;
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
