//! Discovery of the SDKs and runtimes already present on this machine.
//!
//! Every listing asks each candidate `dotnet` executable afresh; nothing is
//! cached or persisted.

pub mod locations;
pub mod models;
pub mod parser;
pub mod runner;

pub use locations::{Candidate, InventoryLocations};
pub use models::{ArtifactKind, InstallationOrigin, InstalledArtifact};
pub use runner::{CommandError, CommandRunner, TokioCommandRunner};

use futures::future::join_all;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;

const LIST_SDKS_OPTION: &str = "--list-sdks";
const LIST_RUNTIMES_OPTION: &str = "--list-runtimes";

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Refresh superseded by a newer request")]
    Superseded,

    #[error("Refresh task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{} is not the install folder of version {version}", .path.display())]
    UnexpectedPath { path: PathBuf, version: String },

    #[error("Failed to delete {}: {source}", .path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// SDKs and runtimes listed by one refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    pub sdks: Vec<InstalledArtifact>,
    pub runtimes: Vec<InstalledArtifact>,
}

pub struct DotnetInventory {
    locations: InventoryLocations,
    runner: Arc<dyn CommandRunner>,
}

impl DotnetInventory {
    pub fn new(locations: InventoryLocations) -> Self {
        Self::with_runner(locations, Arc::new(TokioCommandRunner))
    }

    pub fn with_runner(locations: InventoryLocations, runner: Arc<dyn CommandRunner>) -> Self {
        Self { locations, runner }
    }

    /// Inventory for the running host
    pub fn detect() -> Option<Self> {
        InventoryLocations::detect().map(Self::new)
    }

    pub fn locations(&self) -> &InventoryLocations {
        &self.locations
    }

    /// Every SDK reported by any candidate, ascending by version
    pub async fn list_installed_sdks(&self) -> Vec<InstalledArtifact> {
        let candidates = self.candidates().await;
        self.collect(&candidates, LIST_SDKS_OPTION, parser::parse_sdks).await
    }

    /// Every runtime reported by any candidate, ascending by version
    pub async fn list_installed_runtimes(&self) -> Vec<InstalledArtifact> {
        let candidates = self.candidates().await;
        self.collect(&candidates, LIST_RUNTIMES_OPTION, parser::parse_runtimes)
            .await
    }

    /// Both listings over one probe of the candidate locations
    pub async fn snapshot(&self) -> InventorySnapshot {
        let candidates = self.candidates().await;
        let (sdks, runtimes) = tokio::join!(
            self.collect(&candidates, LIST_SDKS_OPTION, parser::parse_sdks),
            self.collect(&candidates, LIST_RUNTIMES_OPTION, parser::parse_runtimes)
        );
        InventorySnapshot { sdks, runtimes }
    }

    async fn candidates(&self) -> Vec<Candidate> {
        let locations = self.locations.clone();
        match tokio::task::spawn_blocking(move || locations.candidates()).await {
            Ok(candidates) => {
                log::debug!("Found {} dotnet executables", candidates.len());
                candidates
            }
            Err(e) => {
                log::warn!("Failed to probe dotnet locations: {}", e);
                Vec::new()
            }
        }
    }

    async fn collect(
        &self,
        candidates: &[Candidate],
        option: &str,
        parse: fn(&str, InstallationOrigin) -> Vec<InstalledArtifact>,
    ) -> Vec<InstalledArtifact> {
        let runs = candidates.iter().map(|candidate| async move {
            match self.runner.run(&candidate.executable, &[option]).await {
                Ok(stdout) => parse(&stdout, candidate.origin),
                Err(e) => {
                    // A broken install must not hide the others
                    log::warn!("Unable to execute dotnet command: {}", e);
                    Vec::new()
                }
            }
        });

        let mut artifacts: Vec<InstalledArtifact> = join_all(runs).await.into_iter().flatten().collect();
        artifacts.sort_by(models::by_version);
        artifacts
    }
}

/// Remove the install folder of `artifact`, e.g. `~/.dotnet/sdk/8.0.404`.
///
/// Refuses paths whose last segment is not the artifact's version, so a
/// malformed listing cannot delete a whole install root.
pub async fn delete_artifact(artifact: &InstalledArtifact) -> Result<(), InventoryError> {
    let path = &artifact.install_path;
    if path.file_name().and_then(|n| n.to_str()) != Some(artifact.version.as_str()) {
        log::warn!("Refusing to delete {:?}: not a {} folder", path, artifact.version);
        return Err(InventoryError::UnexpectedPath {
            path: path.clone(),
            version: artifact.version.clone(),
        });
    }

    tokio::fs::remove_dir_all(path)
        .await
        .map_err(|source| InventoryError::DeleteFailed {
            path: path.clone(),
            source,
        })?;
    log::info!("Deleted {:?}", path);
    Ok(())
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Serialises refreshes for one consumer: starting a refresh aborts the one
/// still in flight, whose caller then gets [`InventoryError::Superseded`].
pub struct InventoryRefresher {
    inventory: Arc<DotnetInventory>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl InventoryRefresher {
    pub fn new(inventory: Arc<DotnetInventory>) -> Self {
        Self {
            inventory,
            in_flight: Mutex::new(None),
        }
    }

    pub async fn refresh(&self) -> Result<InventorySnapshot, InventoryError> {
        let inventory = self.inventory.clone();
        let task = tokio::spawn(async move { inventory.snapshot().await });
        let _abort = AbortOnDrop(task.abort_handle());

        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }

        match task.await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_cancelled() => {
                log::debug!("Inventory refresh superseded");
                Err(InventoryError::Superseded)
            }
            Err(e) => Err(InventoryError::Task(e)),
        }
    }
}
