pub mod config;
pub mod core;
pub mod error;
pub mod placement;
pub mod resolver;


pub use error::InstallError;

use crate::dotnet::installer::core::downloader::{ArchiveAcquisition, ReqwestTransport};
use crate::dotnet::installer::core::traits::{HttpTransport, TransportError};
use crate::dotnet::metadata::ReleaseFeedClient;
use crate::dotnet::types::{ArtifactRequest, CancelToken, ProgressReporter};
use config::{TransportConfig, TEMP_FILE_PREFIX};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Successful result of one install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The artifact was downloaded and placed at `path`
    Installed { path: PathBuf, version: String },
    /// `path` already existed; nothing was downloaded
    AlreadyInstalled { path: PathBuf, version: String },
}

impl InstallOutcome {
    pub fn path(&self) -> &Path {
        match self {
            InstallOutcome::Installed { path, .. } | InstallOutcome::AlreadyInstalled { path, .. } => path,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            InstallOutcome::Installed { version, .. }
            | InstallOutcome::AlreadyInstalled { version, .. } => version,
        }
    }

    pub fn is_already_installed(&self) -> bool {
        matches!(self, InstallOutcome::AlreadyInstalled { .. })
    }
}

/// Drives one request through feed resolution, download, extraction and placement.
///
/// Holds no per-request state, so one installer may serve concurrent requests.
#[derive(Clone)]
pub struct ArtifactInstaller {
    feed: ReleaseFeedClient,
    acquisition: ArchiveAcquisition,
}

impl ArtifactInstaller {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            feed: ReleaseFeedClient::new(transport.clone()),
            acquisition: ArchiveAcquisition::new(transport),
        }
    }

    /// Installer talking to the public feed over reqwest
    pub fn with_config(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(config)?)))
    }

    /// Read the release index from `url` instead of the public feed
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed = self.feed.with_url(url);
        self
    }

    /// Keep temporary downloads under `root`
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.acquisition = self.acquisition.with_temp_root(root);
        self
    }

    pub fn feed(&self) -> &ReleaseFeedClient {
        &self.feed
    }

    /// Install the latest build of the requested channel.
    ///
    /// Reports `done` exactly once, with the failure message on error.
    pub async fn install(
        &self,
        request: &ArtifactRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<InstallOutcome, InstallError> {
        let result = self.run(request, reporter).await;
        report(&result, request, reporter);
        result
    }

    /// Like [`install`](Self::install), but stops as soon as `cancel` fires.
    ///
    /// Cancellation returns [`InstallError::Cancelled`] and reports nothing.
    /// Temporary files are removed as the pipeline future is dropped.
    pub async fn install_cancellable(
        &self,
        request: &ArtifactRequest,
        reporter: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<InstallOutcome, InstallError> {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("Install of {} {} cancelled", request.artifact_type, request.channel);
                Err(InstallError::Cancelled)
            }
            result = self.run(request, reporter) => {
                report(&result, request, reporter);
                result
            }
        }
    }

    /// [`install_cancellable`](Self::install_cancellable) bounded by `deadline`
    pub async fn install_with_deadline(
        &self,
        request: &ArtifactRequest,
        reporter: &dyn ProgressReporter,
        cancel: &CancelToken,
        deadline: Duration,
    ) -> Result<InstallOutcome, InstallError> {
        match tokio::time::timeout(deadline, self.install_cancellable(request, reporter, cancel)).await {
            Ok(result) => result,
            Err(_) => {
                let err = InstallError::DeadlineExceeded { after: deadline };
                log::warn!("Install of {} {}: {}", request.artifact_type, request.channel, err);
                reporter.done(false, Some(&err.to_string()));
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request: &ArtifactRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<InstallOutcome, InstallError> {
        log::info!(
            "Starting install: channel={}, type={}, rid={}, base={:?}",
            request.channel,
            request.artifact_type,
            request.rid,
            request.base_install_folder
        );

        reporter.start_step("Resolving");
        let record = resolver::resolve_latest(&self.feed, request.channel).await?;
        let version = resolver::component_version(&record, request.artifact_type)?.to_string();
        let target =
            placement::compute_target_path(&request.base_install_folder, request.artifact_type, &version);

        if placement::check_already_installed(&target).await {
            log::info!("{} {} is already installed at {:?}", request.artifact_type, version, target);
            return Ok(InstallOutcome::AlreadyInstalled { path: target, version });
        }

        let file = resolver::select_download(&record, request)?;
        reporter.set_message(&format!("{} {}", request.artifact_type, version));

        let extracted = self
            .acquisition
            .download_and_extract(
                &file.url,
                TEMP_FILE_PREFIX,
                request.rid.file_extension(),
                file.hash.as_deref(),
                reporter,
            )
            .await?;

        reporter.start_step("Installing");
        let source =
            placement::locate_source_subpath(extracted.path(), request.artifact_type, &version).await?;
        placement::place_atomically(&source, &target).await?;
        extracted.cleanup();

        log::info!("Installed {} {} to {:?}", request.artifact_type, version, target);
        Ok(InstallOutcome::Installed { path: target, version })
    }
}

fn report(
    result: &Result<InstallOutcome, InstallError>,
    request: &ArtifactRequest,
    reporter: &dyn ProgressReporter,
) {
    match result {
        Ok(InstallOutcome::Installed { path, version }) => {
            let message = format!("Installed {} {} to {}", request.artifact_type, version, path.display());
            reporter.done(true, Some(&message));
        }
        Ok(InstallOutcome::AlreadyInstalled { path, version }) => {
            let message = format!(
                "{} {} is already installed at {}",
                request.artifact_type,
                version,
                path.display()
            );
            reporter.done(true, Some(&message));
        }
        Err(e) => {
            log::error!("Install of {} {} failed: {}", request.artifact_type, request.channel, e);
            reporter.done(false, Some(&e.to_string()));
        }
    }
}
