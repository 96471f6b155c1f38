//! Tagging through an external ffmpeg binary

use super::traits::MetadataTagger;
use crate::error::TagError;
use crate::types::Track;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Lines of ffmpeg stderr kept in a [`TagError::Failed`]
const STDERR_TAIL_LINES: usize = 5;

/// Tagger that stream-copies the container through `ffmpeg` with new metadata
///
/// The audio is never re-encoded (`-c copy`), so tagging is fast and lossless.
pub struct FfmpegTagger {
    binary_path: PathBuf,
}

impl FfmpegTagger {
    /// Create a tagger with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Path of the binary this tagger runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Metadata arguments for `track`; the artist doubles as album artist
    pub fn metadata_args(track: &Track) -> Vec<String> {
        vec![
            "-metadata".into(),
            format!("title={}", track.title),
            "-metadata".into(),
            format!("artist={}", track.artist),
            "-metadata".into(),
            format!("album={}", track.album),
            "-metadata".into(),
            format!("album_artist={}", track.artist),
        ]
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl MetadataTagger for FfmpegTagger {
    async fn apply(&self, input: &Path, output: &Path, track: &Track) -> Result<(), TagError> {
        let result = Command::new(&self.binary_path)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c", "copy"])
            .args(Self::metadata_args(track))
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TagError::Launch {
                tool: self.binary_path.display().to_string(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            return Err(TagError::Failed {
                code: result.status.code(),
                stderr: stderr_tail(&result.stderr),
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
