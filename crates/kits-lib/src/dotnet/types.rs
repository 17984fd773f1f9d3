use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::watch;

/// Progress reporter trait for download operations.
/// Implementations forward updates to the UI/notification system.
pub trait ProgressReporter: Send + Sync {
    /// Start a new named step
    fn start_step(&self, name: &str);

    /// Update bytes transferred for download progress
    fn update_bytes(&self, transferred: u64, total: Option<u64>);

    /// Set a short status message
    fn set_message(&self, message: &str);

    /// Mark operation as complete. Called once per completed operation, never on cancellation.
    fn done(&self, success: bool, message: Option<&str>);
}

/// A progress reporter that does nothing (silent).
/// Useful for background refreshes or tests.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start_step(&self, _name: &str) {}
    fn update_bytes(&self, _transferred: u64, _total: Option<u64>) {}
    fn set_message(&self, _message: &str) {}
    fn done(&self, _success: bool, _message: Option<&str>) {}
}

/// Owning side of a cancellation scope, e.g. held by the visible panel.
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken::new(self.tx.subscribe())
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation token wrapper
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the scope is cancelled. Pends forever if the source is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// .NET release channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelVersion {
    #[serde(rename = "10.0")]
    Version10,
    #[serde(rename = "9.0")]
    Version9,
    #[serde(rename = "8.0")]
    Version8,
    #[serde(rename = "7.0")]
    Version7,
    #[serde(rename = "6.0")]
    Version6,
    #[serde(rename = "5.0")]
    Version5,
}

impl ChannelVersion {
    pub const ALL: [ChannelVersion; 6] = [
        ChannelVersion::Version10,
        ChannelVersion::Version9,
        ChannelVersion::Version8,
        ChannelVersion::Version7,
        ChannelVersion::Version6,
        ChannelVersion::Version5,
    ];

    /// Channel string as it appears in the release index (e.g. "10.0")
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelVersion::Version10 => "10.0",
            ChannelVersion::Version9 => "9.0",
            ChannelVersion::Version8 => "8.0",
            ChannelVersion::Version7 => "7.0",
            ChannelVersion::Version6 => "6.0",
            ChannelVersion::Version5 => "5.0",
        }
    }
}

impl fmt::Display for ChannelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelVersion {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelVersion::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| ParseEnumError::new("channel", s))
    }
}

/// Kind of downloadable component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    Sdk,
    Runtime,
    AspNetRuntime,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 3] = [
        ArtifactType::Sdk,
        ArtifactType::Runtime,
        ArtifactType::AspNetRuntime,
    ];

    /// File name prefix used by the release feed
    pub fn type_id(&self) -> &'static str {
        match self {
            ArtifactType::Sdk => "dotnet-sdk",
            ArtifactType::Runtime => "dotnet-runtime",
            ArtifactType::AspNetRuntime => "aspnetcore-runtime",
        }
    }

    /// Folder segments, relative to a dotnet root, that hold one folder per version.
    /// Shared by target path computation and archive layout lookup.
    pub fn layout_segments(&self) -> &'static [&'static str] {
        match self {
            ArtifactType::Sdk => &["sdk"],
            ArtifactType::Runtime => &["shared", "Microsoft.NETCore.App"],
            ArtifactType::AspNetRuntime => &["shared", "Microsoft.AspNetCore.App"],
        }
    }

    /// `root` joined with [`Self::layout_segments`]
    pub fn layout_dir(&self, root: &Path) -> PathBuf {
        self.layout_segments()
            .iter()
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactType::Sdk => ".NET SDK",
            ArtifactType::Runtime => ".NET Runtime",
            ArtifactType::AspNetRuntime => "ASP.NET Core Runtime",
        })
    }
}

impl FromStr for ArtifactType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sdk" | "dotnet-sdk" => Ok(ArtifactType::Sdk),
            "runtime" | "dotnet-runtime" => Ok(ArtifactType::Runtime),
            "aspnet-runtime" | "aspnetcore-runtime" | "aspnet" => Ok(ArtifactType::AspNetRuntime),
            _ => Err(ParseEnumError::new("artifact type", s)),
        }
    }
}

/// Runtime identifier of a downloadable build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformRid {
    #[serde(rename = "linux-x64")]
    LinuxX64,
    #[serde(rename = "linux-arm64")]
    LinuxArm64,
    #[serde(rename = "win-x64")]
    WinX64,
    #[serde(rename = "win-arm64")]
    WinArm64,
    #[serde(rename = "osx-x64")]
    MacX64,
    #[serde(rename = "osx-arm64")]
    MacArm64,
}

impl PlatformRid {
    pub const ALL: [PlatformRid; 6] = [
        PlatformRid::LinuxX64,
        PlatformRid::LinuxArm64,
        PlatformRid::WinX64,
        PlatformRid::WinArm64,
        PlatformRid::MacX64,
        PlatformRid::MacArm64,
    ];

    pub fn rid_id(&self) -> &'static str {
        match self {
            PlatformRid::LinuxX64 => "linux-x64",
            PlatformRid::LinuxArm64 => "linux-arm64",
            PlatformRid::WinX64 => "win-x64",
            PlatformRid::WinArm64 => "win-arm64",
            PlatformRid::MacX64 => "osx-x64",
            PlatformRid::MacArm64 => "osx-arm64",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, PlatformRid::WinX64 | PlatformRid::WinArm64)
    }

    /// Archive extension published for this RID
    pub fn file_extension(&self) -> &'static str {
        if self.is_windows() {
            ".zip"
        } else {
            ".tar.gz"
        }
    }

    /// RID matching the given host, treating 32-bit x86 hosts as x64
    pub fn from_host(host: HostPlatform) -> Option<Self> {
        match (host.os, host.arch) {
            (HostOs::Linux, HostArch::X64 | HostArch::X86) => Some(PlatformRid::LinuxX64),
            (HostOs::Linux, HostArch::Arm64) => Some(PlatformRid::LinuxArm64),
            (HostOs::Windows, HostArch::X64 | HostArch::X86) => Some(PlatformRid::WinX64),
            (HostOs::Windows, HostArch::Arm64) => Some(PlatformRid::WinArm64),
            (HostOs::MacOS, HostArch::X64 | HostArch::X86) => Some(PlatformRid::MacX64),
            (HostOs::MacOS, HostArch::Arm64) => Some(PlatformRid::MacArm64),
            _ => None,
        }
    }
}

impl fmt::Display for PlatformRid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rid_id())
    }
}

impl FromStr for PlatformRid {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformRid::ALL
            .into_iter()
            .find(|rid| rid.rid_id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("RID", s))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Operating system families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    MacOS,
    Linux,
    Other,
}

/// Architecture types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArch {
    X64,
    X86,
    Arm64,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    pub arch: HostArch,
}

impl HostPlatform {
    pub fn new(os: HostOs, arch: HostArch) -> Self {
        Self { os, arch }
    }

    /// Detect the running platform
    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            HostOs::Windows
        } else if cfg!(target_os = "macos") {
            HostOs::MacOS
        } else if cfg!(target_os = "linux") {
            HostOs::Linux
        } else {
            HostOs::Other
        };

        let arch = if cfg!(target_arch = "x86_64") {
            HostArch::X64
        } else if cfg!(target_arch = "x86") {
            HostArch::X86
        } else if cfg!(target_arch = "aarch64") {
            HostArch::Arm64
        } else {
            HostArch::Other
        };

        Self { os, arch }
    }

    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }

    pub fn dotnet_executable_name(&self) -> &'static str {
        if self.is_windows() {
            "dotnet.exe"
        } else {
            "dotnet"
        }
    }
}

/// One download request. Fully determines which archive is fetched and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub channel: ChannelVersion,
    pub artifact_type: ArtifactType,
    pub rid: PlatformRid,
    pub base_install_folder: PathBuf,
}

impl ArtifactRequest {
    pub fn new(
        channel: ChannelVersion,
        artifact_type: ArtifactType,
        rid: PlatformRid,
        base_install_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            channel,
            artifact_type,
            rid,
            base_install_folder: base_install_folder.into(),
        }
    }

    /// Latest SDK for the host into `home/.dotnet`, or None on hosts without a published RID
    pub fn default_for_host(host: HostPlatform, home: &Path) -> Option<Self> {
        let rid = PlatformRid::from_host(host)?;
        Some(Self::new(
            ChannelVersion::Version10,
            ArtifactType::Sdk,
            rid,
            home.join(".dotnet"),
        ))
    }

    /// Name the release feed publishes this build under, e.g. `dotnet-sdk-linux-x64.tar.gz`
    pub fn expected_file_name(&self) -> String {
        format!(
            "{}-{}{}",
            self.artifact_type.type_id(),
            self.rid.rid_id(),
            self.rid.file_extension()
        )
    }
}
