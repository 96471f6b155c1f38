//! Safe in-place tagging via a sibling temporary file

use super::traits::MetadataTagger;
use crate::error::TagError;
use crate::types::Track;
use crate::utils::{discard_temp, sibling_temp};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;

/// Applies a [`MetadataTagger`] to a fetched file without ever risking the original
///
/// The tagger writes to a uniquely named sibling file (`song.tagging.<random>.m4a`) which
/// is renamed over the original only after the tagger succeeded and produced a non-empty
/// file. On any failure the temporary file is removed and the untagged original stays
/// where it was.
#[derive(Clone)]
pub struct TagWriter {
    tagger: Arc<dyn MetadataTagger>,
}

impl TagWriter {
    /// Create a writer over `tagger`
    pub fn new(tagger: Arc<dyn MetadataTagger>) -> Self {
        Self { tagger }
    }

    /// Whether the underlying tagger can tag at all
    pub fn is_enabled(&self) -> bool {
        self.tagger.is_available()
    }

    /// Name of the underlying tagger
    pub fn tagger_name(&self) -> &'static str {
        self.tagger.name()
    }

    /// Tag the file at `path` with `track`'s metadata.
    ///
    /// # Errors
    ///
    /// [`TagError::MissingInput`] if `path` does not exist or is empty; the tagger is not
    /// invoked in that case. Otherwise whatever the tagger reports, or
    /// [`TagError::MissingOutput`] if it reported success without writing anything.
    pub async fn tag(&self, path: &Path, track: &Track) -> Result<(), TagError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                return Err(TagError::MissingInput {
                    path: path.to_path_buf(),
                });
            }
        }

        let temp = tagging_temp(path)?;
        if let Err(e) = self.apply_checked(path, &temp, track).await {
            discard_temp(temp);
            return Err(e);
        }

        temp.persist(path).map_err(|e| TagError::Io(e.error))?;
        tracing::debug!(path = %path.display(), tagger = self.tagger.name(), "metadata written");
        Ok(())
    }

    async fn apply_checked(&self, path: &Path, temp: &Path, track: &Track) -> Result<(), TagError> {
        self.tagger.apply(path, temp, track).await?;

        match tokio::fs::metadata(temp).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(TagError::MissingOutput {
                path: temp.to_path_buf(),
            }),
        }
    }
}

// The extension stays last so tools that infer the container from the output name still
// pick the right muxer
fn tagging_temp(path: &Path) -> Result<TempPath, TagError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    sibling_temp(path, &format!("{stem}.tagging."), &suffix).map_err(TagError::Io)
}
