use super::archive::{extract_archive, ArchiveKind};
use super::traits::{HttpTransport, TransportError};
use crate::dotnet::installer::config::TransportConfig;
use crate::dotnet::installer::error::InstallError;
use crate::dotnet::types::ProgressReporter;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha512};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::{TempDir, TempPath};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// [`HttpTransport`] backed by a shared reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("HTTP {} from {}", status, url);
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        log::debug!("Fetching: {}", url);
        let response = self.get_checked(url).await?;
        let bytes = response.bytes().await?;
        log::trace!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    async fn stream_to_file(
        &self,
        url: &str,
        destination: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<u64, TransportError> {
        log::debug!("Downloading: {} -> {:?}", url, destination);
        let start = Instant::now();

        let response = self.get_checked(url).await?;
        let total_size = response.content_length();
        log::debug!("Download size: {:?} bytes", total_size);

        let mut file = File::create(destination).await?;
        let mut downloaded: u64 = 0;
        let mut chunk_count: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;

            downloaded += chunk.len() as u64;
            chunk_count += 1;
            reporter.update_bytes(downloaded, total_size);
        }
        file.flush().await?;
        file.sync_all().await?;

        let secs = start.elapsed().as_secs_f64();
        let throughput = (downloaded as f64 / 1024.0 / 1024.0) / secs.max(0.001); // MB/s
        log::info!(
            "Download stats: url={}, size={} bytes, chunks={}, time={:.2}s, throughput={:.2} MB/s",
            url,
            downloaded,
            chunk_count,
            secs,
            throughput
        );

        Ok(downloaded)
    }
}

/// A downloaded archive and the directory it was extracted into.
///
/// Both live in temporary storage and are deleted when this value is dropped,
/// including when the owning future is cancelled.
pub struct ExtractedArchive {
    archive: TempPath,
    dir: TempDir,
}

impl ExtractedArchive {
    /// Root of the extracted tree
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Delete the temporary archive and directory now, logging failures.
    /// Contents already moved out of the directory are not an error.
    pub fn cleanup(self) {
        let archive_path = self.archive.to_path_buf();
        if let Err(e) = self.archive.close() {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove temporary archive {:?}: {}", archive_path, e);
            }
        }

        let dir_path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove extraction directory {:?}: {}", dir_path, e);
            }
        }
    }
}

/// Downloads an archive into a temporary file and extracts it into a temporary directory
#[derive(Clone)]
pub struct ArchiveAcquisition {
    transport: Arc<dyn HttpTransport>,
    temp_root: Option<PathBuf>,
}

impl ArchiveAcquisition {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            temp_root: None,
        }
    }

    /// Create temporary files under `root` instead of the system temp directory.
    /// Keeping them on the install volume lets placement rename instead of copy.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    fn builder<'a>(prefix: &'a str, suffix: &'a str) -> tempfile::Builder<'a, 'a> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(suffix);
        builder
    }

    fn create_temp_file(&self, prefix: &str, extension: &str) -> io::Result<TempPath> {
        let builder = Self::builder(prefix, extension);
        let file = match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempfile_in(root)?
            }
            None => builder.tempfile()?,
        };
        Ok(file.into_temp_path())
    }

    fn create_temp_dir(&self, prefix: &str) -> io::Result<TempDir> {
        let builder = Self::builder(prefix, "");
        match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }

    /// Stream `url` into a fresh temp file, optionally verify its SHA-512,
    /// then extract it into a fresh temp directory.
    ///
    /// On any failure the temporary file and directory are already gone when
    /// this returns.
    pub async fn download_and_extract(
        &self,
        url: &str,
        file_prefix: &str,
        extension: &str,
        expected_sha512: Option<&str>,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExtractedArchive, InstallError> {
        let download_failed = |source: TransportError| InstallError::DownloadFailed {
            url: url.to_string(),
            source,
        };

        let archive = self
            .create_temp_file(file_prefix, extension)
            .map_err(|e| download_failed(e.into()))?;
        log::trace!("Temporary file for the archive download: {:?}", archive);

        reporter.start_step("Downloading");
        if let Err(e) = self.transport.stream_to_file(url, &archive, reporter).await {
            log::warn!("Download of {} failed: {}", url, e);
            return Err(download_failed(e));
        }

        if let Some(expected) = expected_sha512 {
            verify_sha512(&archive, expected, url)
                .await
                .map_err(download_failed)?;
        }

        let extraction_failed = |source: io::Error| InstallError::ExtractionFailed {
            archive: archive.to_path_buf(),
            source,
        };

        let dir = self
            .create_temp_dir(&format!("{}-extract", file_prefix))
            .map_err(extraction_failed)?;
        log::trace!("Temporary directory for the archive extraction: {:?}", dir.path());

        reporter.start_step("Extracting");
        if let Err(e) = extract_archive(&archive, dir.path(), ArchiveKind::from_extension(extension)).await {
            log::warn!("Extraction of {:?} failed: {}", archive, e);
            return Err(extraction_failed(e));
        }

        Ok(ExtractedArchive { archive, dir })
    }
}

/// Compare the SHA-512 of `path` with `expected` (hex, case-insensitive)
pub async fn verify_sha512(path: &Path, expected: &str, url: &str) -> Result<(), TransportError> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha512::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let computed = format!("{:x}", hasher.finalize());
    if !computed.eq_ignore_ascii_case(expected.trim()) {
        log::warn!("SHA-512 mismatch for {}: expected {}, got {}", url, expected, computed);
        return Err(TransportError::ChecksumMismatch {
            url: url.to_string(),
            expected: expected.to_string(),
            actual: computed,
        });
    }

    log::debug!("SHA-512 validated: {}", url);
    Ok(())
}
