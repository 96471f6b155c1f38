//! Metadata tagging
//!
//! The core abstraction is the [`MetadataTagger`] trait, the external process boundary.
//! Two implementations are provided:
//!
//! - [`FfmpegTagger`]: stream-copies the file through an external `ffmpeg` binary
//! - [`NoOpTagger`]: stub used when no binary is available
//!
//! [`TagWriter`] wraps a tagger and handles the temporary-file dance so a failed
//! invocation never destroys the fetched audio.

mod ffmpeg;
mod noop;
mod traits;
mod writer;

pub use ffmpeg::FfmpegTagger;
pub use noop::NoOpTagger;
pub use traits::MetadataTagger;
pub use writer::TagWriter;

use crate::config::ToolsConfig;
use std::sync::Arc;

/// Pick a tagger according to the tools configuration
///
/// An explicit `ffmpeg_path` wins; otherwise PATH is searched when allowed. Falls back to
/// [`NoOpTagger`].
pub fn tagger_from_config(tools: &ToolsConfig) -> Arc<dyn MetadataTagger> {
    let tagger: Arc<dyn MetadataTagger> = if let Some(ref ffmpeg_path) = tools.ffmpeg_path {
        Arc::new(FfmpegTagger::new(ffmpeg_path.clone()))
    } else if tools.search_path {
        FfmpegTagger::from_path()
            .map(|t| Arc::new(t) as Arc<dyn MetadataTagger>)
            .unwrap_or_else(|| Arc::new(NoOpTagger))
    } else {
        Arc::new(NoOpTagger)
    };

    tracing::info!(
        tagger = tagger.name(),
        available = tagger.is_available(),
        "metadata tagger initialized"
    );
    tagger
}
