//! Archive packaging for mobile delivery

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Packs a finished download directory into a single file
#[async_trait]
pub trait ArchivePackager: Send + Sync {
    /// Pack everything under `source_dir` into `archive_path`, returning the number of
    /// files written
    async fn package(&self, source_dir: &Path, archive_path: &Path) -> Result<usize>;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}

/// Packager writing an uncompressed zip
///
/// Audio containers are already compressed, so entries are stored as-is.
pub struct ZipPackager;

#[async_trait]
impl ArchivePackager for ZipPackager {
    async fn package(&self, source_dir: &Path, archive_path: &Path) -> Result<usize> {
        let source_dir = source_dir.to_path_buf();
        let archive_path = archive_path.to_path_buf();

        tokio::task::spawn_blocking(move || write_zip(&source_dir, &archive_path))
            .await
            .map_err(|e| Error::Archive(format!("packaging task failed: {e}")))?
    }

    fn name(&self) -> &'static str {
        "zip"
    }
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Archive(e.to_string())
}

/// Entry name with `/` separators regardless of platform
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_zip(source_dir: &Path, archive_path: &Path) -> Result<usize> {
    let file = File::create(archive_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let mut files = 0;
    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Archive(format!("failed to walk directory: {e}")))?;
        let path = entry.path();
        if path == archive_path {
            continue;
        }

        let relative: PathBuf = path
            .strip_prefix(source_dir)
            .map_err(|e| Error::Archive(e.to_string()))?
            .to_path_buf();
        let name = entry_name(&relative);

        if entry.file_type().is_dir() {
            writer.add_directory(name, options).map_err(zip_error)?;
        } else {
            writer.start_file(name, options).map_err(zip_error)?;
            let mut input = File::open(path)?;
            std::io::copy(&mut input, &mut writer)?;
            files += 1;
        }
    }

    writer.finish().map_err(zip_error)?;
    tracing::info!(
        archive = %archive_path.display(),
        files = files,
        "archive written"
    );
    Ok(files)
}
