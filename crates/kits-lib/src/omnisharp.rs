//! OmniSharp language server downloads.
//!
//! Builds are published per platform under a fixed blob container; the
//! `latest` folder always holds the newest release.

use crate::dotnet::installer::config::{OMNISHARP_RELEASES_URL, OMNISHARP_TEMP_FILE_PREFIX};
use crate::dotnet::installer::core::downloader::ArchiveAcquisition;
use crate::dotnet::installer::core::traits::HttpTransport;
use crate::dotnet::installer::error::InstallError;
use crate::dotnet::installer::placement::place_atomically;
use crate::dotnet::types::{CancelToken, HostArch, HostOs, HostPlatform, ProgressReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const LATEST_VERSION: &str = "latest";

fn platform_suffix(host: HostPlatform) -> Option<&'static str> {
    match (host.os, host.arch) {
        (HostOs::Linux, HostArch::X64) => Some("linux-x64"),
        (HostOs::Linux, HostArch::X86) => Some("linux-x86"),
        (HostOs::Linux, HostArch::Arm64) => Some("linux-arm64"),
        (HostOs::Windows, HostArch::X64) => Some("win-x64"),
        (HostOs::Windows, HostArch::X86) => Some("win-x86"),
        (HostOs::Windows, HostArch::Arm64) => Some("win-arm64"),
        // One universal build for every Mac
        (HostOs::MacOS, _) => Some("osx"),
        _ => None,
    }
}

pub fn archive_extension(host: HostPlatform) -> &'static str {
    if host.is_windows() {
        ".zip"
    } else {
        ".tar.gz"
    }
}

/// `{base}/{version}/omnisharp-{platform}{extension}` for `host`
pub fn download_url(base: &str, version: &str, host: HostPlatform) -> Result<String, InstallError> {
    let suffix = platform_suffix(host).ok_or_else(|| InstallError::UnsupportedPlatform {
        platform: format!("{:?}/{:?}", host.os, host.arch),
    })?;
    Ok(format!(
        "{}/{}/omnisharp-{}{}",
        base.trim_end_matches('/'),
        version,
        suffix,
        archive_extension(host)
    ))
}

/// Default install folder, `~/.omnisharp`
pub fn default_target(home: &Path) -> PathBuf {
    home.join(".omnisharp")
}

#[derive(Clone)]
pub struct OmnisharpInstaller {
    acquisition: ArchiveAcquisition,
    base_url: String,
    host: HostPlatform,
}

impl OmnisharpInstaller {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            acquisition: ArchiveAcquisition::new(transport),
            base_url: OMNISHARP_RELEASES_URL.to_string(),
            host: HostPlatform::current(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.acquisition = self.acquisition.with_temp_root(root);
        self
    }

    /// Download the latest build and make `target` hold exactly its contents.
    /// Whatever `target` held before is replaced.
    pub async fn install_latest(
        &self,
        target: &Path,
        reporter: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<PathBuf, InstallError> {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("OmniSharp download cancelled");
                Err(InstallError::Cancelled)
            }
            result = self.run(target, reporter) => {
                match &result {
                    Ok(path) => reporter.done(true, Some(&format!("OmniSharp installed to {}", path.display()))),
                    Err(e) => {
                        log::error!("OmniSharp download failed: {}", e);
                        reporter.done(false, Some(&e.to_string()));
                    }
                }
                result
            }
        }
    }

    async fn run(&self, target: &Path, reporter: &dyn ProgressReporter) -> Result<PathBuf, InstallError> {
        let url = download_url(&self.base_url, LATEST_VERSION, self.host)?;
        log::info!("Downloading OmniSharp from {}", url);

        let extracted = self
            .acquisition
            .download_and_extract(&url, OMNISHARP_TEMP_FILE_PREFIX, archive_extension(self.host), None, reporter)
            .await?;

        reporter.start_step("Installing");
        place_atomically(extracted.path(), target).await?;
        extracted.cleanup();

        log::info!("OmniSharp installed to {:?}", target);
        Ok(target.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dotnet::installer::config::TransportConfig;
    use crate::dotnet::installer::core::archive::tests::{write_tar_gz, write_zip};
    use crate::dotnet::installer::core::downloader::ReqwestTransport;
    use crate::dotnet::types::{CancelSource, SilentProgressReporter};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "https://roslynomnisharp.blob.core.windows.net/releases";

    #[test]
    fn builds_platform_urls() {
        let cases = [
            (HostOs::Linux, HostArch::X64, "omnisharp-linux-x64.tar.gz"),
            (HostOs::Linux, HostArch::X86, "omnisharp-linux-x86.tar.gz"),
            (HostOs::Linux, HostArch::Arm64, "omnisharp-linux-arm64.tar.gz"),
            (HostOs::Windows, HostArch::X64, "omnisharp-win-x64.zip"),
            (HostOs::Windows, HostArch::X86, "omnisharp-win-x86.zip"),
            (HostOs::Windows, HostArch::Arm64, "omnisharp-win-arm64.zip"),
            (HostOs::MacOS, HostArch::Arm64, "omnisharp-osx.tar.gz"),
            (HostOs::MacOS, HostArch::X64, "omnisharp-osx.tar.gz"),
        ];
        for (os, arch, file) in cases {
            let url = download_url(BASE, LATEST_VERSION, HostPlatform::new(os, arch)).unwrap();
            assert_eq!(url, format!("{}/latest/{}", BASE, file));
        }
    }

    #[test]
    fn unsupported_host_is_an_error() {
        let err = download_url(BASE, LATEST_VERSION, HostPlatform::new(HostOs::Other, HostArch::X64))
            .unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedPlatform { .. }));

        let err = download_url(BASE, LATEST_VERSION, HostPlatform::new(HostOs::Linux, HostArch::Other))
            .unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedPlatform { .. }));
    }

    fn installer(server: &MockServer, host: HostPlatform, temp_root: &Path) -> OmnisharpInstaller {
        let transport = Arc::new(ReqwestTransport::new(&TransportConfig::default()).unwrap());
        OmnisharpInstaller::new(transport)
            .with_base_url(server.uri())
            .with_host(host)
            .with_temp_root(temp_root)
    }

    #[tokio::test]
    async fn replaces_target_with_latest_build() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("omnisharp.tar.gz");
        write_tar_gz(
            &archive,
            &[("OmniSharp.dll", &b"server"[..]), ("bin/run", &b"#!/bin/sh"[..])],
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest/omnisharp-linux-x64.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(std::fs::read(&archive).unwrap()))
            .expect(1)
            .mount(&server)
            .await;

        let target = tmp.path().join("home/.omnisharp");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("old.dll"), b"old").unwrap();

        let temp_root = tmp.path().join("tmp");
        let host = HostPlatform::new(HostOs::Linux, HostArch::X64);
        let path = installer(&server, host, &temp_root)
            .install_latest(&target, &SilentProgressReporter, &CancelSource::new().token())
            .await
            .unwrap();

        assert_eq!(path, target);
        assert_eq!(std::fs::read(target.join("OmniSharp.dll")).unwrap(), b"server");
        assert!(target.join("bin/run").exists());
        assert!(!target.join("old.dll").exists());
        assert_eq!(std::fs::read_dir(&temp_root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn windows_build_is_a_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("omnisharp.zip");
        write_zip(&archive, &[("OmniSharp.exe", &b"server"[..])]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest/omnisharp-win-x64.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(std::fs::read(&archive).unwrap()))
            .mount(&server)
            .await;

        let target = tmp.path().join(".omnisharp");
        let host = HostPlatform::new(HostOs::Windows, HostArch::X64);
        installer(&server, host, &tmp.path().join("tmp"))
            .install_latest(&target, &SilentProgressReporter, &CancelSource::new().token())
            .await
            .unwrap();

        assert!(target.join("OmniSharp.exe").exists());
    }

    #[test]
    fn default_target_is_in_home() {
        assert_eq!(default_target(Path::new("/home/u")), PathBuf::from("/home/u/.omnisharp"));
    }
}
