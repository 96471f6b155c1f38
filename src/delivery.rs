//! Desktop and mobile delivery flows
//!
//! Desktop delivery downloads straight into a directory the operator chose. Mobile
//! delivery downloads into a transient working directory, packs it into an archive,
//! serves the archive on the local network until cancelled, and then removes both.

use crate::archive::ArchivePackager;
use crate::config::MobileConfig;
use crate::coordinator::DownloadCoordinator;
use crate::error::Result;
use crate::server::LocalServer;
use crate::types::{Summary, Track};
use crate::utils::remove_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Download `tracks` into `destination_dir` and report the result
pub async fn run_desktop(
    coordinator: &DownloadCoordinator,
    tracks: Vec<Track>,
    destination_dir: &Path,
) -> Result<Summary> {
    let summary = coordinator.run(tracks, destination_dir).await?;
    for failure in summary.failures() {
        if let Some(reason) = failure.failure() {
            tracing::warn!(track = %failure.track, reason = %reason, "not downloaded");
        }
    }
    tracing::info!(
        succeeded = summary.succeeded,
        total = summary.total,
        "{} of {} tracks downloaded",
        summary.succeeded,
        summary.total
    );
    Ok(summary)
}

/// Working directory and archive that only live for one mobile run
///
/// [`cleanup`](Self::cleanup) removes both exactly once, no matter how many times or from
/// how many tasks it is called.
#[derive(Debug)]
pub struct TransientWorkspace {
    dir: PathBuf,
    archive: PathBuf,
    cleaned: AtomicBool,
}

impl TransientWorkspace {
    /// Clear leftovers from an earlier run under `base_dir` and create a fresh working
    /// directory.
    ///
    /// # Errors
    ///
    /// Failing to create the working directory is fatal for the run.
    pub async fn prepare(base_dir: &Path, config: &MobileConfig) -> Result<Self> {
        let dir = base_dir.join(&config.working_dir_name);
        let archive = base_dir.join(&config.archive_name);

        for stale in [&dir, &archive] {
            if let Err(e) = remove_path(stale).await {
                tracing::warn!(path = %stale.display(), error = %e, "failed to remove stale artifact");
            }
        }

        tokio::fs::create_dir_all(&dir).await.inspect_err(|e| {
            tracing::error!(path = %dir.display(), error = %e, "cannot create working directory");
        })?;

        Ok(Self {
            dir,
            archive,
            cleaned: AtomicBool::new(false),
        })
    }

    /// The working directory tracks are downloaded into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the archive is written
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Remove the working directory and archive.
    ///
    /// Returns `true` for the call that performed the cleanup and `false` for every later
    /// call. Already-missing paths are not an error.
    pub async fn cleanup(&self) -> bool {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return false;
        }
        for path in [&self.dir, &self.archive] {
            if let Err(e) = remove_path(path).await {
                tracing::warn!(path = %path.display(), error = %e, "cleanup failed");
            }
        }
        tracing::info!(dir = %self.dir.display(), "transient workspace removed");
        true
    }
}

/// Download, package and serve for retrieval by a device on the local network
pub struct MobileDelivery {
    coordinator: DownloadCoordinator,
    packager: Arc<dyn ArchivePackager>,
    config: MobileConfig,
}

impl MobileDelivery {
    /// Create a mobile delivery flow
    ///
    /// The coordinator's cancellation token also stops the server.
    pub fn new(
        coordinator: DownloadCoordinator,
        packager: Arc<dyn ArchivePackager>,
        config: MobileConfig,
    ) -> Self {
        Self {
            coordinator,
            packager,
            config,
        }
    }

    /// Run the whole flow under `base_dir`
    ///
    /// Returns once the run has been cancelled (or failed) and the workspace is gone.
    pub async fn run(&self, tracks: Vec<Track>, base_dir: &Path) -> Result<Summary> {
        let workspace = TransientWorkspace::prepare(base_dir, &self.config).await?;
        let result = self.run_in(&workspace, tracks).await;
        workspace.cleanup().await;
        result
    }

    async fn run_in(&self, workspace: &TransientWorkspace, tracks: Vec<Track>) -> Result<Summary> {
        let token = self.coordinator.cancellation_token();
        let summary = run_desktop(&self.coordinator, tracks, workspace.dir()).await?;
        if token.is_cancelled() {
            tracing::info!("cancelled before packaging");
            return Ok(summary);
        }

        let files = self
            .packager
            .package(workspace.dir(), workspace.archive_path())
            .await?;
        tracing::info!(files = files, packager = self.packager.name(), "archive ready");

        LocalServer::new(
            self.config.bind_address,
            workspace.archive_path().to_path_buf(),
        )
        .serve(token)
        .await?;

        Ok(summary)
    }
}
