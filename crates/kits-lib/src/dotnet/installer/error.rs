use super::core::traits::TransportError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Failures of the artifact acquisition pipeline.
///
/// "Already installed" is not listed here: it is a successful
/// [`InstallOutcome::AlreadyInstalled`](super::InstallOutcome::AlreadyInstalled).
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Release feed unavailable at {url}: {source}")]
    FeedUnavailable {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("Channel {channel} not found in the release index")]
    ChannelNotFound { channel: String },

    #[error("Release {release} of channel {channel} not found in {url}")]
    ReleaseNotFound {
        channel: String,
        release: String,
        url: String,
    },

    #[error("Release {release} has no {component} build")]
    ComponentNotFound { component: String, release: String },

    #[error("File {file_name} not found in release {release}")]
    FileNotFound { file_name: String, release: String },

    #[error("Failed to download {url}: {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to extract {}: {source}", .archive.display())]
    ExtractionFailed {
        archive: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Extracted archive has no {} folder (found: {found:?})", .expected.display())]
    LayoutMismatch { expected: PathBuf, found: Vec<String> },

    /// `backup` is set when the previous install could not be moved back and
    /// still sits at that path
    #[error("Failed to place artifact at {}: {source}{}", .target.display(), stranded_note(.backup))]
    PlacementFailed {
        target: PathBuf,
        backup: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation did not finish within {}s", .after.as_secs())]
    DeadlineExceeded { after: Duration },

    #[error("No published build for platform {platform}")]
    UnsupportedPlatform { platform: String },
}

fn stranded_note(backup: &Option<PathBuf>) -> String {
    match backup {
        Some(path) => format!(" (previous install left at {})", path.display()),
        None => String::new(),
    }
}

impl InstallError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallError::Cancelled)
    }

    /// Network and I/O hiccups the user may simply retry later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InstallError::FeedUnavailable { .. }
                | InstallError::DownloadFailed { .. }
                | InstallError::DeadlineExceeded { .. }
        )
    }
}
