pub mod dotnet;
pub mod omnisharp;
pub mod utils;

// Re-export the types hosts reach for most often
pub use dotnet::installer::{ArtifactInstaller, InstallError, InstallOutcome};
pub use dotnet::inventory::{
    DotnetInventory, InstallationOrigin, InstalledArtifact, InventoryRefresher,
};
pub use dotnet::types::{
    ArtifactRequest, ArtifactType, CancelSource, CancelToken, ChannelVersion, PlatformRid,
    ProgressReporter, SilentProgressReporter,
};
