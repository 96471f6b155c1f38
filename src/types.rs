//! Core types for trackdl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::normalize::normalize;

/// A track identity as produced by the source catalog
///
/// The catalog is the source of truth; a `Track` is never mutated after it is produced.
/// Workers receive their own clone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    /// Track title
    pub title: String,
    /// Primary artist
    pub artist: String,
    /// Album the track appears on
    pub album: String,
}

impl Track {
    /// Create a new track
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
        }
    }

    /// Copy of this track with every field normalized for comparison
    pub fn normalized(&self) -> Self {
        Self {
            title: normalize(&self.title),
            artist: normalize(&self.artist),
            album: normalize(&self.album),
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' by '{}'", self.title, self.artist)
    }
}

/// Provider-specific identifier of an audio stream
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Create a new ProviderId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One result returned by the search index for a query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Result title
    pub title: String,
    /// Result artist(s)
    pub artist: String,
    /// Result album
    pub album: String,
    /// Id to request the audio stream with
    pub provider_id: ProviderId,
}

impl Candidate {
    /// Create a new candidate
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        provider_id: impl Into<ProviderId>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            provider_id: provider_id.into(),
        }
    }

    /// Copy of this candidate with its text fields normalized; the id is untouched
    pub fn normalized(&self) -> Self {
        Self {
            title: normalize(&self.title),
            artist: normalize(&self.artist),
            album: normalize(&self.album),
            provider_id: self.provider_id.clone(),
        }
    }
}

/// Per-field similarity of a candidate to a target track, each part in `[0, 1]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    /// Title similarity
    pub title: f64,
    /// Artist similarity (0 when the artist containment check fails)
    pub artist: f64,
    /// Album similarity (1 for an exact single)
    pub album: f64,
    /// Unweighted mean of the three parts
    pub total: f64,
}

impl MatchScore {
    /// Build a score from its parts, computing the mean
    pub fn from_parts(title: f64, artist: f64, album: f64) -> Self {
        Self {
            title,
            artist,
            album,
            total: (title + artist + album) / 3.0,
        }
    }
}

/// Why a job did not produce a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The search query failed
    Resolution(String),
    /// The search succeeded but no candidate was eligible
    NoMatchFound,
    /// The stream could not be fetched or written
    Fetch(String),
    /// Every stream request returned no bytes
    ZeroByteStall {
        /// Number of stream requests made
        attempts: u32,
    },
    /// Tagging failed; the untagged file is kept
    Tag(String),
    /// The final file was empty and has been removed
    EmptyOutput,
    /// The run was cancelled before the job finished
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Resolution(msg) => write!(f, "resolution failed: {msg}"),
            FailureReason::NoMatchFound => f.write_str("no matching audio found"),
            FailureReason::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            FailureReason::ZeroByteStall { attempts } => {
                write!(f, "stream stayed empty after {attempts} attempts")
            }
            FailureReason::Tag(msg) => write!(f, "tagging failed: {msg}"),
            FailureReason::EmptyOutput => f.write_str("final file was empty"),
            FailureReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Lifecycle state of a download job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued, not yet picked up by a worker
    Pending,
    /// Searching for a matching audio stream
    Resolving,
    /// Writing the audio stream to disk
    Fetching,
    /// Stamping metadata onto the file
    Tagging,
    /// File written, tagged and verified
    Succeeded,
    /// Job failed with a reason
    Failed(FailureReason),
}

impl JobStatus {
    /// Whether the job has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed(_))
    }

    /// Whether the job is holding a worker on network or process I/O
    pub fn is_transferring(&self) -> bool {
        matches!(self, JobStatus::Fetching | JobStatus::Tagging)
    }
}

/// A track travelling through the pipeline
///
/// Created when a batch enters the coordinator and discarded once the batch completes.
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// Position of the track in the input batch
    pub index: usize,
    /// The track to download
    pub track: Track,
    /// Where the audio file is written
    pub destination: PathBuf,
    /// Current lifecycle state
    pub status: JobStatus,
}

impl DownloadJob {
    /// Create a pending job
    pub fn new(index: usize, track: Track, destination: PathBuf) -> Self {
        Self {
            index,
            track,
            destination,
            status: JobStatus::Pending,
        }
    }

    /// Freeze the job into its reported outcome
    pub fn into_outcome(self) -> JobOutcome {
        JobOutcome {
            index: self.index,
            track: self.track,
            destination: self.destination,
            status: self.status,
        }
    }
}

/// Final state of one job, as reported in a [`Summary`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Position of the track in the input batch
    pub index: usize,
    /// The track
    pub track: Track,
    /// Destination path (only present on disk when the job succeeded or failed at tagging)
    pub destination: PathBuf,
    /// Terminal status
    pub status: JobStatus,
}

impl JobOutcome {
    /// Whether the job succeeded
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Failure reason, if the job failed
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            JobStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result of a batch run
///
/// Outcomes are in completion order, which need not match input order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of tracks in the batch
    pub total: usize,
    /// Number of jobs that succeeded
    pub succeeded: usize,
    /// Per-track outcomes
    pub outcomes: Vec<JobOutcome>,
}

impl Summary {
    /// Number of jobs that failed
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    /// Iterate over failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    /// Outcomes sorted back into input order
    pub fn in_input_order(&self) -> Vec<&JobOutcome> {
        let mut outcomes: Vec<_> = self.outcomes.iter().collect();
        outcomes.sort_by_key(|o| o.index);
        outcomes
    }
}

/// Events emitted by the coordinator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A job moved to a new state
    JobStatusChanged {
        /// Position of the track in the input batch
        index: usize,
        /// Track title
        title: String,
        /// Track artist
        artist: String,
        /// The new state
        status: JobStatus,
    },
    /// Every job in the batch reached a terminal state
    BatchFinished {
        /// Jobs that succeeded
        succeeded: usize,
        /// Jobs that failed
        failed: usize,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_score_total_is_unweighted_mean() {
        let score = MatchScore::from_parts(1.0, 0.5, 0.0);
        assert!((score.total - 0.5).abs() < f64::EPSILON);

        let perfect = MatchScore::from_parts(1.0, 1.0, 1.0);
        assert_eq!(perfect.total, 1.0);
    }

    #[test]
    fn normalized_candidate_keeps_provider_id() {
        let candidate = Candidate::new("Café", "BJÖRK", "Début", "Id-With-Case");
        let normalized = candidate.normalized();

        assert_eq!(normalized.title, "cafe");
        assert_eq!(normalized.artist, "bjork");
        assert_eq!(normalized.album, "debut");
        assert_eq!(normalized.provider_id.as_str(), "Id-With-Case");
    }

    #[test]
    fn job_status_classification() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed(FailureReason::NoMatchFound).is_terminal());
        assert!(JobStatus::Fetching.is_transferring());
        assert!(JobStatus::Tagging.is_transferring());
        assert!(!JobStatus::Resolving.is_transferring());
    }

    #[test]
    fn summary_counts_and_ordering() {
        let outcome = |index: usize, status: JobStatus| JobOutcome {
            index,
            track: Track::new(format!("t{index}"), "a", "b"),
            destination: PathBuf::from(format!("/music/t{index}.m4a")),
            status,
        };
        let summary = Summary {
            total: 3,
            succeeded: 2,
            outcomes: vec![
                outcome(2, JobStatus::Succeeded),
                outcome(0, JobStatus::Failed(FailureReason::NoMatchFound)),
                outcome(1, JobStatus::Succeeded),
            ],
        };

        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures().count(), 1);
        let ordered: Vec<usize> = summary.in_input_order().iter().map(|o| o.index).collect();
        assert_eq!(ordered, vec![0, 1, 2]);
    }

    #[test]
    fn failed_status_serializes_with_reason() {
        let status = JobStatus::Failed(FailureReason::ZeroByteStall { attempts: 6 });
        let json = serde_json::to_value(&status).expect("serialize failed");

        assert_eq!(json["state"], "failed");
        assert_eq!(json["reason"]["kind"], "zero_byte_stall");
        assert_eq!(json["reason"]["detail"]["attempts"], 6);
    }

    #[test]
    fn track_display_names_title_and_artist() {
        let track = Track::new("Hey Jude", "The Beatles", "Hey Jude");
        assert_eq!(track.to_string(), "'Hey Jude' by 'The Beatles'");
    }
}
