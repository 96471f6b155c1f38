//! Trait for metadata tagging backends

use crate::error::TagError;
use crate::types::Track;
use async_trait::async_trait;
use std::path::Path;

/// Stamps track metadata onto an audio file
///
/// Implementations read `input` and write a tagged copy to `output`. They must never
/// modify `input`; replacing the original is the job of
/// [`TagWriter`](super::TagWriter).
///
/// # Examples
///
/// ```no_run
/// use trackdl::tagging::{FfmpegTagger, MetadataTagger};
/// use trackdl::Track;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tagger = FfmpegTagger::from_path().expect("ffmpeg not found");
/// let track = Track::new("Windowlicker", "Aphex Twin", "Windowlicker");
///
/// tagger
///     .apply(Path::new("in.m4a"), Path::new("out.m4a"), &track)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MetadataTagger: Send + Sync {
    /// Write a copy of `input` tagged with `track`'s title, artist and album to `output`
    async fn apply(&self, input: &Path, output: &Path, track: &Track) -> Result<(), TagError>;

    /// Whether this backend can tag at all
    ///
    /// The coordinator skips the tagging step for unavailable backends instead of
    /// failing every job.
    fn is_available(&self) -> bool;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}
