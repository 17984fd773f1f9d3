use crate::utils::version::SemanticVersion;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Which kind of location a discovered `dotnet` lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationOrigin {
    /// System-wide install or the `dotnet` found on PATH
    Default,
    /// The per-user `~/.dotnet` convention, where this tool installs to
    Manual,
    /// A copy managed by the IDE under its `dotnet-cmd` folder
    IdeManaged,
}

impl fmt::Display for InstallationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallationOrigin::Default => "default",
            InstallationOrigin::Manual => "manual",
            InstallationOrigin::IdeManaged => "ide-managed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArtifactKind {
    Sdk,
    /// `component` is the shared framework name, e.g. `Microsoft.NETCore.App`
    Runtime { component: String },
}

/// An SDK or runtime reported by a local `dotnet` executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledArtifact {
    #[serde(flatten)]
    pub kind: ArtifactKind,
    /// Version exactly as printed by the CLI
    pub version: String,
    #[serde(skip)]
    pub semver: SemanticVersion,
    /// Folder holding this version, e.g. `/usr/share/dotnet/sdk/8.0.100`
    pub install_path: PathBuf,
    pub origin: InstallationOrigin,
}

impl InstalledArtifact {
    pub fn sdk(version: &str, install_path: PathBuf, origin: InstallationOrigin) -> Self {
        Self {
            kind: ArtifactKind::Sdk,
            version: version.to_string(),
            semver: SemanticVersion::parse(version),
            install_path,
            origin,
        }
    }

    pub fn runtime(
        component: &str,
        version: &str,
        install_path: PathBuf,
        origin: InstallationOrigin,
    ) -> Self {
        Self {
            kind: ArtifactKind::Runtime {
                component: component.to_string(),
            },
            version: version.to_string(),
            semver: SemanticVersion::parse(version),
            install_path,
            origin,
        }
    }

    pub fn triplet(&self) -> (u32, u32, u32) {
        self.semver.triplet()
    }

    pub fn pre_release(&self) -> Option<&str> {
        self.semver.pre_release.as_deref()
    }

    /// Shared framework name for runtimes, `None` for SDKs
    pub fn component(&self) -> Option<&str> {
        match &self.kind {
            ArtifactKind::Sdk => None,
            ArtifactKind::Runtime { component } => Some(component),
        }
    }

    pub fn is_sdk(&self) -> bool {
        matches!(self.kind, ArtifactKind::Sdk)
    }
}

/// Ordering used for every listing: ascending version, release after its pre-releases
pub fn by_version(a: &InstalledArtifact, b: &InstalledArtifact) -> Ordering {
    a.semver.cmp(&b.semver)
}

impl fmt::Display for InstalledArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ArtifactKind::Sdk => write!(f, "{} [{}]", self.version, self.install_path.display()),
            ArtifactKind::Runtime { component } => write!(
                f,
                "{} {} [{}]",
                component,
                self.version,
                self.install_path.display()
            ),
        }
    }
}
