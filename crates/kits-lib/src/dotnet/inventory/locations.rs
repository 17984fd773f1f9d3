use super::models::InstallationOrigin;
use crate::dotnet::types::{HostOs, HostPlatform};
use directories::BaseDirs;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A `dotnet` executable worth asking for its SDKs and runtimes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub executable: PathBuf,
    pub origin: InstallationOrigin,
}

impl Candidate {
    fn new(executable: PathBuf, origin: InstallationOrigin) -> Self {
        Self { executable, origin }
    }
}

/// Where to look for `dotnet` executables on one host
#[derive(Debug, Clone)]
pub struct InventoryLocations {
    host: HostPlatform,
    home: PathBuf,
    system_dirs: Vec<PathBuf>,
    ide_managed_root: Option<PathBuf>,
    search_path: bool,
}

impl InventoryLocations {
    pub fn new(host: HostPlatform, home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            host,
            system_dirs: default_system_dirs(host.os),
            ide_managed_root: Some(default_ide_managed_root(host.os, &home)),
            home,
            search_path: true,
        }
    }

    /// Locations for the running host, `None` when no home directory is known
    pub fn detect() -> Option<Self> {
        let base = BaseDirs::new()?;
        let host = HostPlatform::current();
        let mut locations = Self::new(host, base.home_dir());
        if host.is_windows() {
            locations.ide_managed_root = Some(base.data_local_dir().join("JetBrains").join("dotnet-cmd"));
        }
        Some(locations)
    }

    /// Replace the well-known system install folders
    pub fn with_system_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.system_dirs = dirs;
        self
    }

    pub fn with_ide_managed_root(mut self, root: Option<PathBuf>) -> Self {
        self.ide_managed_root = root;
        self
    }

    /// Whether the `dotnet` found on PATH is considered
    pub fn with_path_lookup(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Per-user install folder, `~/.dotnet`
    pub fn manual_install_dir(&self) -> PathBuf {
        self.home.join(".dotnet")
    }

    pub fn ide_managed_root(&self) -> Option<&Path> {
        self.ide_managed_root.as_deref()
    }

    /// Existing executables in probe order: the manual install, system folders,
    /// IDE-managed copies, then PATH. Paths resolving to the same file are kept once.
    ///
    /// Touches the filesystem; call from a blocking context.
    pub fn candidates(&self) -> Vec<Candidate> {
        let exe = self.host.dotnet_executable_name();
        let mut all = vec![Candidate::new(
            self.manual_install_dir().join(exe),
            InstallationOrigin::Manual,
        )];

        all.extend(
            self.system_dirs
                .iter()
                .map(|dir| Candidate::new(dir.join(exe), InstallationOrigin::Default)),
        );

        if let Some(root) = &self.ide_managed_root {
            all.extend(
                ide_managed_dirs(root)
                    .into_iter()
                    .map(|dir| Candidate::new(dir.join(exe), InstallationOrigin::IdeManaged)),
            );
        }

        if self.search_path {
            match which::which(exe) {
                Ok(path) => all.push(Candidate::new(path, InstallationOrigin::Default)),
                Err(e) => log::trace!("No {} on PATH: {}", exe, e),
            }
        }

        let mut seen = HashSet::new();
        all.into_iter()
            .filter(|candidate| candidate.executable.is_file())
            .filter(|candidate| {
                let key = std::fs::canonicalize(&candidate.executable)
                    .unwrap_or_else(|_| candidate.executable.clone());
                seen.insert(key)
            })
            .collect()
    }
}

fn default_system_dirs(os: HostOs) -> Vec<PathBuf> {
    match os {
        HostOs::Windows => vec![
            PathBuf::from(r"C:\Program Files\dotnet"),
            PathBuf::from(r"C:\Program Files (x86)\dotnet"),
        ],
        HostOs::Linux => vec![
            PathBuf::from("/usr/lib/dotnet"),
            PathBuf::from("/usr/share/dotnet"),
            PathBuf::from("/usr/lib64/dotnet"),
        ],
        HostOs::MacOS | HostOs::Other => vec![PathBuf::from("/usr/local/share/dotnet")],
    }
}

fn default_ide_managed_root(os: HostOs, home: &Path) -> PathBuf {
    match os {
        HostOs::Windows => home.join("AppData").join("Local").join("JetBrains").join("dotnet-cmd"),
        _ => home.join(".local").join("share").join("JetBrains").join("dotnet-cmd"),
    }
}

/// Each child folder of the IDE root holds one dotnet install
fn ide_managed_dirs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dotnet::types::HostArch;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn linux_locations(home: &Path) -> InventoryLocations {
        InventoryLocations::new(HostPlatform::new(HostOs::Linux, HostArch::X64), home)
            .with_path_lookup(false)
    }

    #[test]
    fn default_locations_follow_platform_conventions() {
        let linux = linux_locations(Path::new("/home/u"));
        assert_eq!(linux.manual_install_dir(), PathBuf::from("/home/u/.dotnet"));
        assert_eq!(
            linux.ide_managed_root(),
            Some(Path::new("/home/u/.local/share/JetBrains/dotnet-cmd"))
        );
        assert!(linux.system_dirs.contains(&PathBuf::from("/usr/share/dotnet")));

        let mac = InventoryLocations::new(HostPlatform::new(HostOs::MacOS, HostArch::Arm64), "/Users/u");
        assert_eq!(mac.system_dirs, vec![PathBuf::from("/usr/local/share/dotnet")]);
    }

    #[test]
    fn keeps_existing_candidates_in_probe_order() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        let system = tmp.path().join("usr/share/dotnet");
        let missing = tmp.path().join("usr/lib64/dotnet");
        let ide_root = tmp.path().join("ide");

        touch(&home.join(".dotnet/dotnet"));
        touch(&system.join("dotnet"));
        touch(&ide_root.join("2024.3/dotnet"));
        touch(&ide_root.join("2025.1/dotnet"));
        // Folder without an executable is skipped
        fs::create_dir_all(ide_root.join("broken")).unwrap();

        let candidates = linux_locations(&home)
            .with_system_dirs(vec![system.clone(), missing])
            .with_ide_managed_root(Some(ide_root.clone()))
            .candidates();

        assert_eq!(
            candidates,
            vec![
                Candidate::new(home.join(".dotnet/dotnet"), InstallationOrigin::Manual),
                Candidate::new(system.join("dotnet"), InstallationOrigin::Default),
                Candidate::new(ide_root.join("2024.3/dotnet"), InstallationOrigin::IdeManaged),
                Candidate::new(ide_root.join("2025.1/dotnet"), InstallationOrigin::IdeManaged),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_duplicates_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        let real = tmp.path().join("usr/share/dotnet");
        let linked = tmp.path().join("usr/lib/dotnet");
        touch(&real.join("dotnet"));
        fs::create_dir_all(&linked).unwrap();
        std::os::unix::fs::symlink(real.join("dotnet"), linked.join("dotnet")).unwrap();

        let candidates = linux_locations(&home)
            .with_system_dirs(vec![real.clone(), linked])
            .with_ide_managed_root(None)
            .candidates();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].executable, real.join("dotnet"));
    }
}
