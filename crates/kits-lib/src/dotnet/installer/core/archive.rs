use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tar::Archive;

/// Archive formats published by the release feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// `.zip` selects zip, anything else is treated as gzipped tar
    pub fn from_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case(".zip") || extension.eq_ignore_ascii_case("zip") {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }
}

/// Flags the blocking extractor to stop once the awaiting future goes away
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Extract `archive` fully into `dest`.
///
/// Runs on the blocking pool. If the returned future is dropped the extractor
/// stops after the entry in progress and removes `dest` again.
pub async fn extract_archive(archive: &Path, dest: &Path, kind: ArchiveKind) -> io::Result<()> {
    log::debug!("Extracting {:?} ({:?}) to {:?}", archive, kind, dest);

    let stop = Arc::new(AtomicBool::new(false));
    let _guard = StopOnDrop(stop.clone());
    let archive: PathBuf = archive.to_path_buf();
    let dest: PathBuf = dest.to_path_buf();

    let entries = tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest, kind, &stop))
    .await
    .map_err(io::Error::other)??;

    log::debug!("Extraction complete: {} entries", entries);
    Ok(())
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "extraction abandoned")
}

fn checkpoint(stop: &AtomicBool) -> io::Result<()> {
    if stop.load(Ordering::SeqCst) {
        return Err(interrupted());
    }
    Ok(())
}

fn extract_blocking(archive: &Path, dest: &Path, kind: ArchiveKind, stop: &AtomicBool) -> io::Result<usize> {
    let result = match kind {
        ArchiveKind::Zip => extract_zip_file(archive, dest, stop),
        ArchiveKind::TarGz => extract_tar_gz_file(archive, dest, stop),
    };

    // The owner may already have deleted `dest`; an entry unpacked since then
    // recreated part of it
    if stop.load(Ordering::SeqCst) {
        match std::fs::remove_dir_all(dest) {
            Ok(()) => log::debug!("Removed abandoned extraction {:?}", dest),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove abandoned extraction {:?}: {}", dest, e),
        }
        return Err(interrupted());
    }
    result
}

fn extract_tar_gz_file(archive: &Path, dest: &Path, stop: &AtomicBool) -> io::Result<usize> {
    std::fs::create_dir_all(dest)?;

    let decoder = GzDecoder::new(BufReader::new(File::open(archive)?));
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);

    let mut count = 0;
    for entry in archive.entries()? {
        checkpoint(stop)?;
        let mut entry = entry?;
        // unpack_in refuses paths escaping dest
        let unpacked = entry.unpack_in(dest)?;
        checkpoint(stop)?;
        if !unpacked {
            log::warn!("Skipped tar entry outside destination: {:?}", entry.path()?);
            continue;
        }
        count += 1;
    }
    Ok(count)
}

fn extract_zip_file(archive: &Path, dest: &Path, stop: &AtomicBool) -> io::Result<usize> {
    std::fs::create_dir_all(dest)?;

    let reader = BufReader::new(File::open(archive)?);
    let mut zip = zip::ZipArchive::new(reader).map_err(io::Error::other)?;

    let mut count = 0;
    for i in 0..zip.len() {
        checkpoint(stop)?;
        let mut file = zip.by_index(i).map_err(io::Error::other)?;
        let Some(relative) = file.enclosed_name() else {
            log::warn!("Skipped zip entry outside destination: {}", file.name());
            continue;
        };
        let outpath = dest.join(relative);

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
        checkpoint(stop)?;
        count += 1;
    }
    Ok(count)
}
