//! Worker loop: drains the shared queue one job at a time

use super::Pipeline;
use crate::error::FetchError;
use crate::types::{DownloadJob, Event, FailureReason, JobOutcome, JobStatus};
use crate::utils::{file_size, remove_path};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Everything a worker needs, cloned per worker
pub(super) struct WorkerContext {
    pub(super) worker_id: usize,
    pub(super) pipeline: Arc<Pipeline>,
    pub(super) queue: Arc<Mutex<VecDeque<DownloadJob>>>,
    pub(super) results: mpsc::UnboundedSender<JobOutcome>,
    pub(super) event_tx: broadcast::Sender<Event>,
    pub(super) cancel_token: CancellationToken,
}

impl WorkerContext {
    fn transition(&self, job: &mut DownloadJob, status: JobStatus) {
        tracing::debug!(
            worker = self.worker_id,
            index = job.index,
            title = %job.track.title,
            status = ?status,
            "job status changed"
        );
        job.status = status.clone();
        self.event_tx
            .send(Event::JobStatusChanged {
                index: job.index,
                title: job.track.title.clone(),
                artist: job.track.artist.clone(),
                status,
            })
            .ok();
    }
}

/// Process jobs until the queue is empty
///
/// Once cancellation is observed, remaining queued jobs are still drained and reported
/// as cancelled so every track gets an outcome.
pub(super) async fn run_worker(ctx: WorkerContext) {
    loop {
        let next = ctx.queue.lock().await.pop_front();
        let Some(mut job) = next else {
            break;
        };

        let status = if ctx.cancel_token.is_cancelled() {
            JobStatus::Failed(FailureReason::Cancelled)
        } else {
            process_job(&ctx, &mut job).await
        };
        ctx.transition(&mut job, status);

        if ctx.results.send(job.into_outcome()).is_err() {
            tracing::warn!(worker = ctx.worker_id, "result collector gone, stopping worker");
            break;
        }
    }
}

/// Run the strictly sequential steps of one job, returning its terminal status
async fn process_job(ctx: &WorkerContext, job: &mut DownloadJob) -> JobStatus {
    let pipeline = &ctx.pipeline;

    ctx.transition(job, JobStatus::Resolving);
    let provider_id = match pipeline.resolver.resolve(&job.track).await {
        Ok(Some(id)) => id,
        Ok(None) => return JobStatus::Failed(FailureReason::NoMatchFound),
        Err(e) => return JobStatus::Failed(FailureReason::Resolution(e.to_string())),
    };
    if ctx.cancel_token.is_cancelled() {
        return JobStatus::Failed(FailureReason::Cancelled);
    }

    ctx.transition(job, JobStatus::Fetching);
    match pipeline.fetcher.fetch(&provider_id, &job.destination).await {
        Ok(_) => {}
        Err(FetchError::ZeroByteStall { attempts, .. }) => {
            return JobStatus::Failed(FailureReason::ZeroByteStall { attempts });
        }
        Err(e) => return JobStatus::Failed(FailureReason::Fetch(e.to_string())),
    }
    if ctx.cancel_token.is_cancelled() {
        return JobStatus::Failed(FailureReason::Cancelled);
    }

    if pipeline.tag_writer.is_enabled() {
        ctx.transition(job, JobStatus::Tagging);
        if let Err(e) = pipeline.tag_writer.tag(&job.destination, &job.track).await {
            // The untagged file stays on disk
            return JobStatus::Failed(FailureReason::Tag(e.to_string()));
        }
    } else {
        tracing::debug!(
            index = job.index,
            tagger = pipeline.tag_writer.tagger_name(),
            "tagging unavailable, keeping file untagged"
        );
    }

    verify_output(&job.destination).await
}

/// Final check of a job: an empty file is removed and reported as `EmptyOutput`
async fn verify_output(destination: &Path) -> JobStatus {
    if file_size(destination).await > 0 {
        return JobStatus::Succeeded;
    }
    if let Err(e) = remove_path(destination).await {
        tracing::warn!(path = %destination.display(), error = %e, "failed to remove empty file");
    }
    JobStatus::Failed(FailureReason::EmptyOutput)
}
