//! Final placement of an extracted artifact into the .NET install layout.
//!
//! `{base}/sdk/{version}`, `{base}/shared/Microsoft.NETCore.App/{version}` and
//! `{base}/shared/Microsoft.AspNetCore.App/{version}` all derive from
//! [`ArtifactType::layout_segments`], both for the target and for the
//! location inside the extracted archive.

use super::error::InstallError;
use crate::dotnet::types::ArtifactType;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const STAGING_SUFFIX: &str = "kits-staging";
const BACKUP_SUFFIX: &str = "kits-backup";

pub fn compute_target_path(base: &Path, artifact_type: ArtifactType, version: &str) -> PathBuf {
    artifact_type.layout_dir(base).join(version)
}

/// True when the parent of `target` already lists an entry named like the
/// version segment. A missing parent simply means nothing is installed.
pub async fn check_already_installed(target: &Path) -> bool {
    let (Some(parent), Some(version)) = (target.parent(), target.file_name()) else {
        return false;
    };

    let mut entries = match tokio::fs::read_dir(parent).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log::debug!("Failed to list {:?}: {}", parent, e);
            }
            return false;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name() == version {
            return true;
        }
    }
    false
}

/// Folder inside the extracted archive holding `version` of `artifact_type`.
///
/// Archives mirror the install layout, so the expected folder is the target
/// layout rooted at `extracted` instead of the install base.
pub async fn locate_source_subpath(
    extracted: &Path,
    artifact_type: ArtifactType,
    version: &str,
) -> Result<PathBuf, InstallError> {
    let layout_dir = artifact_type.layout_dir(extracted);
    let expected = layout_dir.join(version);

    let found = list_names(&layout_dir).await;
    if found.iter().any(|name| name == version) && is_dir(&expected).await {
        return Ok(expected);
    }

    log::warn!(
        "Unexpected archive layout: {:?} is missing, {:?} contains {:?}",
        expected,
        layout_dir,
        found
    );
    Err(InstallError::LayoutMismatch { expected, found })
}

async fn list_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return names;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    names
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Move `source` to `target`, replacing whatever is there.
///
/// The tree is first moved next to the target (same directory, so the final
/// step is a rename), then an existing target is set aside, then the staged
/// tree is renamed into place. If the final rename fails the previous target
/// is restored, so the target is either the old tree or the new one.
pub async fn place_atomically(source: &Path, target: &Path) -> Result<(), InstallError> {
    let source = source.to_path_buf();
    let target = target.to_path_buf();

    let joined = tokio::task::spawn_blocking({
        let target = target.clone();
        move || place_blocking(&source, &target)
    })
    .await;

    match joined {
        Ok(Ok(())) => {
            log::info!("Placed artifact at {:?}", target);
            Ok(())
        }
        Ok(Err(PlaceError { source, stranded })) => {
            log::warn!("Failed to place artifact at {:?}: {}", target, source);
            Err(InstallError::PlacementFailed {
                target,
                backup: stranded,
                source,
            })
        }
        Err(join) => Err(InstallError::PlacementFailed {
            target,
            backup: None,
            source: io::Error::other(join),
        }),
    }
}

/// Failed placement. `stranded` is the backup of the previous target when it
/// could not be renamed back.
#[derive(Debug)]
struct PlaceError {
    source: io::Error,
    stranded: Option<PathBuf>,
}

impl From<io::Error> for PlaceError {
    fn from(source: io::Error) -> Self {
        Self { source, stranded: None }
    }
}

fn sibling(target: &Path, suffix: &str) -> io::Result<PathBuf> {
    let name = target
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
    Ok(target.with_file_name(format!(".{}.{}", name, suffix)))
}

fn remove_leftover(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn place_blocking(source: &Path, target: &Path) -> Result<(), PlaceError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let staging = sibling(target, STAGING_SUFFIX)?;
    let backup = sibling(target, BACKUP_SUFFIX)?;

    // Leftovers of an interrupted earlier attempt
    remove_leftover(&staging)?;
    remove_leftover(&backup)?;

    if let Err(e) = move_dir(source, &staging) {
        let _ = remove_leftover(&staging);
        return Err(e.into());
    }

    swap_into_place(&staging, target, &backup, |from, to| fs::rename(from, to))
}

/// Rename `staging` onto `target`, setting an existing target aside as
/// `backup` first and putting it back if the final rename fails.
fn swap_into_place<R>(staging: &Path, target: &Path, backup: &Path, rename: R) -> Result<(), PlaceError>
where
    R: Fn(&Path, &Path) -> io::Result<()>,
{
    let had_previous = target.exists();
    if had_previous {
        log::debug!("Replacing existing {:?}", target);
        if let Err(e) = rename(target, backup) {
            let _ = remove_leftover(staging);
            return Err(e.into());
        }
    }

    if let Err(source) = rename(staging, target) {
        let _ = remove_leftover(staging);
        let mut stranded = None;
        if had_previous {
            if let Err(restore) = rename(backup, target) {
                log::error!("Failed to restore {:?} from {:?}: {}", target, backup, restore);
                stranded = Some(backup.to_path_buf());
            }
        }
        return Err(PlaceError { source, stranded });
    }

    if had_previous {
        if let Err(e) = remove_leftover(backup) {
            log::warn!("Failed to remove replaced install {:?}: {}", backup, e);
        }
    }
    Ok(())
}

fn move_dir(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_link(&err) => {
            log::debug!("{:?} and {:?} are on different volumes, copying", src, dest);
            copy_dir_recursive(src, dest)?;
            fs::remove_dir_all(src)
        }
        Err(err) => Err(err),
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target_path = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &target_path)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target_path)?;
        } else {
            fs::copy(entry.path(), &target_path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dest)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest).map(|_| ())
}

fn is_cross_device_link(err: &io::Error) -> bool {
    // EXDEV on unix, ERROR_NOT_SAME_DEVICE on Windows
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(18)
    }

    #[cfg(windows)]
    {
        err.raw_os_error() == Some(17)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = err;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn target_paths_follow_install_layout() {
        let base = Path::new("/opt/dotnet");
        assert_eq!(
            compute_target_path(base, ArtifactType::Sdk, "8.0.404"),
            PathBuf::from("/opt/dotnet/sdk/8.0.404")
        );
        assert_eq!(
            compute_target_path(base, ArtifactType::Runtime, "8.0.11"),
            PathBuf::from("/opt/dotnet/shared/Microsoft.NETCore.App/8.0.11")
        );
        assert_eq!(
            compute_target_path(base, ArtifactType::AspNetRuntime, "8.0.10"),
            PathBuf::from("/opt/dotnet/shared/Microsoft.AspNetCore.App/8.0.10")
        );
    }

    #[tokio::test]
    async fn source_layout_matches_target_layout() {
        let extracted = tempfile::tempdir().unwrap();
        let base = Path::new("/base");
        for artifact_type in ArtifactType::ALL {
            let source = artifact_type.layout_dir(extracted.path()).join("1.2.3");
            fs::create_dir_all(&source).unwrap();

            let located = locate_source_subpath(extracted.path(), artifact_type, "1.2.3")
                .await
                .unwrap();
            let target = compute_target_path(base, artifact_type, "1.2.3");

            assert_eq!(
                located.strip_prefix(extracted.path()).unwrap(),
                target.strip_prefix(base).unwrap()
            );
        }
    }

    #[tokio::test]
    async fn missing_version_folder_is_layout_mismatch() {
        let extracted = tempfile::tempdir().unwrap();
        fs::create_dir_all(extracted.path().join("sdk/8.0.400")).unwrap();

        let err = locate_source_subpath(extracted.path(), ArtifactType::Sdk, "8.0.404")
            .await
            .unwrap_err();
        match err {
            InstallError::LayoutMismatch { expected, found } => {
                assert!(expected.ends_with("sdk/8.0.404"));
                assert_eq!(found, vec!["8.0.400".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn already_installed_checks_parent_listing() {
        let base = tempfile::tempdir().unwrap();
        let target = compute_target_path(base.path(), ArtifactType::Runtime, "8.0.11");

        assert!(!check_already_installed(&target).await);

        fs::create_dir_all(&target).unwrap();
        assert!(check_already_installed(&target).await);

        let other = compute_target_path(base.path(), ArtifactType::Runtime, "8.0.1");
        assert!(!check_already_installed(&other).await);
    }

    #[tokio::test]
    async fn places_into_missing_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("extract/sdk/8.0.404");
        write(&source.join("dotnet.dll"), "new");

        let target = tmp.path().join("install/sdk/8.0.404");
        place_atomically(&source, &target).await.unwrap();

        assert_eq!(fs::read_to_string(target.join("dotnet.dll")).unwrap(), "new");
        assert!(!source.exists());
        let names: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .flatten()
            .map(|e| e.file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("8.0.404")]);
    }

    #[tokio::test]
    async fn replaces_existing_target_completely() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("sdk/8.0.404");
        write(&target.join("stale.dll"), "old");
        write(&target.join("dotnet.dll"), "old");

        let source = tmp.path().join("extract/8.0.404");
        write(&source.join("dotnet.dll"), "new");

        place_atomically(&source, &target).await.unwrap();

        assert_eq!(fs::read_to_string(target.join("dotnet.dll")).unwrap(), "new");
        assert!(!target.join("stale.dll").exists());
        assert!(!sibling(&target, BACKUP_SUFFIX).unwrap().exists());
    }

    #[tokio::test]
    async fn clears_leftover_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("sdk/9.0.100");
        write(&sibling(&target, STAGING_SUFFIX).unwrap().join("partial.dll"), "x");

        let source = tmp.path().join("extract/9.0.100");
        write(&source.join("dotnet.dll"), "new");

        place_atomically(&source, &target).await.unwrap();
        assert!(!target.join("partial.dll").exists());
        assert!(!sibling(&target, STAGING_SUFFIX).unwrap().exists());
    }

    #[tokio::test]
    async fn missing_source_leaves_target_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("sdk/8.0.404");
        write(&target.join("dotnet.dll"), "old");

        let err = place_atomically(&tmp.path().join("nope"), &target)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::PlacementFailed { .. }));
        assert_eq!(fs::read_to_string(target.join("dotnet.dll")).unwrap(), "old");
    }

    #[test]
    fn failed_swap_restores_previous_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("sdk/8.0.404");
        let staging = tmp.path().join("sdk/.8.0.404.kits-staging");
        let backup = tmp.path().join("sdk/.8.0.404.kits-backup");
        write(&target.join("old.dll"), "old");
        write(&staging.join("new.dll"), "new");

        let err = swap_into_place(&staging, &target, &backup, |from, to| {
            if from == staging.as_path() {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            fs::rename(from, to)
        })
        .unwrap_err();

        assert_eq!(err.source.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(err.stranded, None);
        assert_eq!(fs::read_to_string(target.join("old.dll")).unwrap(), "old");
        assert!(!staging.exists());
        assert!(!backup.exists());
    }

    #[test]
    fn unrestorable_backup_is_named_in_the_error() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("sdk/8.0.404");
        let staging = tmp.path().join("sdk/.8.0.404.kits-staging");
        let backup = tmp.path().join("sdk/.8.0.404.kits-backup");
        write(&target.join("old.dll"), "old");
        write(&staging.join("new.dll"), "new");

        // Only setting the old tree aside succeeds
        let err = swap_into_place(&staging, &target, &backup, |from, to| {
            if from == target.as_path() {
                return fs::rename(from, to);
            }
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        })
        .unwrap_err();

        assert_eq!(err.stranded.as_deref(), Some(backup.as_path()));
        assert_eq!(fs::read_to_string(backup.join("old.dll")).unwrap(), "old");

        let err = InstallError::PlacementFailed {
            target: target.clone(),
            backup: err.stranded,
            source: err.source,
        };
        assert!(err.to_string().contains(".8.0.404.kits-backup"), "{}", err);
    }
}
