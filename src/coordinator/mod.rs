//! Batch download coordinator
//!
//! [`DownloadCoordinator`] drives resolve → fetch → tag → verify for a batch of tracks
//! with a fixed pool of workers draining a shared queue. Each worker sends its finished
//! jobs over a channel to a single collector, which builds the [`Summary`]. A failing job
//! never affects its siblings; only an invalid destination aborts a run, and it does so
//! before any job starts.

mod worker;


use crate::config::Config;
use crate::error::Result;
use crate::fetcher::AudioFetcher;
use crate::providers::{AudioProvider, HttpAudioProvider, HttpSearchIndex, SearchIndex};
use crate::resolver::TrackResolver;
use crate::sanitize::destination_file_name;
use crate::tagging::{MetadataTagger, TagWriter, tagger_from_config};
use crate::types::{DownloadJob, Event, JobOutcome, JobStatus, Summary, Track};
use crate::utils::validate_destination;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use worker::WorkerContext;

/// Capacity of the event channel; slower subscribers see `RecvError::Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// The per-job steps shared by every worker
pub(crate) struct Pipeline {
    pub(crate) resolver: TrackResolver,
    pub(crate) fetcher: AudioFetcher,
    pub(crate) tag_writer: TagWriter,
    pub(crate) file_extension: String,
}

/// Downloads batches of tracks with bounded concurrency
///
/// Cheap to clone; clones share the pipeline, the event channel and the cancellation
/// token.
///
/// # Examples
///
/// ```no_run
/// use trackdl::{Config, DownloadCoordinator, Track};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let coordinator = DownloadCoordinator::from_config(&Config::default())?;
///
/// let mut events = coordinator.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{event:?}");
///     }
/// });
///
/// let tracks = vec![Track::new("Army of Me", "Björk", "Post")];
/// let summary = coordinator.run(tracks, Path::new("/music")).await?;
/// println!("{} of {} downloaded", summary.succeeded, summary.total);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DownloadCoordinator {
    pipeline: Arc<Pipeline>,
    workers: usize,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl DownloadCoordinator {
    /// Create a coordinator over explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is invalid.
    pub fn new(
        search: Arc<dyn SearchIndex>,
        provider: Arc<dyn AudioProvider>,
        tagger: Arc<dyn MetadataTagger>,
        config: &Config,
    ) -> Result<Self> {
        config.validate()?;

        let pipeline = Pipeline {
            resolver: TrackResolver::new(search, config.resolver.top_k),
            fetcher: AudioFetcher::new(provider, config.fetch.retry.clone()),
            tag_writer: TagWriter::new(tagger),
            file_extension: config
                .download
                .file_extension
                .trim_start_matches('.')
                .to_string(),
        };
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            pipeline: Arc::new(pipeline),
            workers: config.download.workers,
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Create a coordinator with the HTTP collaborators and the configured tagger
    pub fn from_config(config: &Config) -> Result<Self> {
        let search = Arc::new(HttpSearchIndex::new(&config.providers)?);
        let provider = Arc::new(HttpAudioProvider::new(&config.providers)?);
        let tagger = tagger_from_config(&config.tools);
        Self::new(search, provider, tagger, config)
    }

    /// Replace the cancellation token, e.g. with one wired to a signal handler
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// The token that cancels runs of this coordinator
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Subscribe to job and batch events
    ///
    /// Multiple subscribers are supported. Each receives every event sent after it
    /// subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Download `tracks` into `destination_dir` with the configured number of workers.
    ///
    /// Per-track failures are reported in the returned [`Summary`], never as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDestination`](crate::Error::InvalidDestination) if the
    /// directory is missing or not a directory. No job is started in that case.
    pub async fn run(&self, tracks: Vec<Track>, destination_dir: &Path) -> Result<Summary> {
        self.run_with_workers(tracks, destination_dir, self.workers)
            .await
    }

    /// Download a single track; always uses one worker
    pub async fn run_single(&self, track: Track, destination_dir: &Path) -> Result<Summary> {
        self.run_with_workers(vec![track], destination_dir, 1).await
    }

    async fn run_with_workers(
        &self,
        tracks: Vec<Track>,
        destination_dir: &Path,
        workers: usize,
    ) -> Result<Summary> {
        validate_destination(destination_dir).await.inspect_err(|e| {
            tracing::error!(error = %e, "aborting run before dispatch");
        })?;

        let total = tracks.len();
        let jobs: VecDeque<DownloadJob> = tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| {
                let destination = destination_dir
                    .join(destination_file_name(&track, &self.pipeline.file_extension));
                DownloadJob::new(index, track, destination)
            })
            .collect();

        let worker_count = workers.min(total);
        tracing::info!(
            tracks = total,
            workers = worker_count,
            destination = %destination_dir.display(),
            "starting batch"
        );

        let queue = Arc::new(Mutex::new(jobs));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<JobOutcome>();

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let ctx = WorkerContext {
                worker_id,
                pipeline: Arc::clone(&self.pipeline),
                queue: Arc::clone(&queue),
                results: result_tx.clone(),
                event_tx: self.event_tx.clone(),
                cancel_token: self.cancel_token.clone(),
            };
            handles.push(tokio::spawn(worker::run_worker(ctx)));
        }
        // The collector stops once every worker has dropped its sender
        drop(result_tx);

        let mut summary = Summary {
            total,
            ..Summary::default()
        };
        while let Some(outcome) = result_rx.recv().await {
            log_outcome(&outcome);
            if outcome.succeeded() {
                summary.succeeded += 1;
            }
            summary.outcomes.push(outcome);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "download worker panicked");
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed(),
            total = summary.total,
            "batch finished"
        );
        self.emit_event(Event::BatchFinished {
            succeeded: summary.succeeded,
            failed: summary.failed(),
        });

        Ok(summary)
    }

    fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

fn log_outcome(outcome: &JobOutcome) {
    match &outcome.status {
        JobStatus::Succeeded => tracing::info!(
            title = %outcome.track.title,
            artist = %outcome.track.artist,
            path = %outcome.destination.display(),
            "downloaded"
        ),
        JobStatus::Failed(reason) => tracing::warn!(
            title = %outcome.track.title,
            artist = %outcome.track.artist,
            reason = %reason,
            "download failed"
        ),
        other => tracing::warn!(
            title = %outcome.track.title,
            status = ?other,
            "job finished in a non-terminal state"
        ),
    }
}
