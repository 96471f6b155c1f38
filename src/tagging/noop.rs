//! No-op tagger for graceful degradation

use super::traits::MetadataTagger;
use crate::error::TagError;
use crate::types::Track;
use async_trait::async_trait;
use std::path::Path;

/// Tagger used when no ffmpeg binary is available or configured
///
/// Reports itself unavailable, so the coordinator keeps fetched files untagged rather
/// than failing every job.
pub struct NoOpTagger;

#[async_trait]
impl MetadataTagger for NoOpTagger {
    async fn apply(&self, _input: &Path, _output: &Path, _track: &Track) -> Result<(), TagError> {
        Err(TagError::Unsupported(
            "metadata tagging requires an external ffmpeg binary. \
             Configure tools.ffmpeg_path or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
