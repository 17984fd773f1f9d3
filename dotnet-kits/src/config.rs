use directories::ProjectDirs;
use kits_lib::dotnet::installer::config::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings read from `config.json` in the platform config directory.
/// Every key is optional; command line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitsConfig {
    /// Release index to resolve channels against
    pub feed_url: Option<String>,
    /// Install root for downloads, `~/.dotnet` when unset
    pub base_install_folder: Option<PathBuf>,
    /// OmniSharp install folder, `~/.omnisharp` when unset
    pub omnisharp_folder: Option<PathBuf>,
    pub ide_managed_root: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    /// `env_logger` filter used when `RUST_LOG` is not set
    pub log_level: Option<String>,
    /// Upper bound for one download, unbounded when unset
    pub deadline_secs: Option<u64>,
}

impl KitsConfig {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dotnet-kits", "dotnet-kits")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Read `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::default();
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}
