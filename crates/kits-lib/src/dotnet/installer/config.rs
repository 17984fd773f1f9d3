//! Centralized installer settings.
//! Static defaults; hosts override them through [`TransportConfig`] and the
//! installer builders.

use std::time::Duration;

/// Top-level index of every .NET release channel
pub const DOTNET_RELEASES_INDEX_URL: &str =
    "https://builds.dotnet.microsoft.com/dotnet/release-metadata/releases-index.json";

/// Blob storage holding OmniSharp release archives, one folder per version
pub const OMNISHARP_RELEASES_URL: &str = "https://roslynomnisharp.blob.core.windows.net/releases";

/// Prefix for temporary download files and extraction folders
pub const TEMP_FILE_PREFIX: &str = "dotnet-kits";

pub const OMNISHARP_TEMP_FILE_PREFIX: &str = "dotnet-kits-omnisharp";

pub const CONNECT_TIMEOUT_SECS: u64 = 30;

pub const USER_AGENT: &str = concat!("dotnet-kits/", env!("CARGO_PKG_VERSION"));

/// Settings for the HTTP client.
///
/// Only the connect phase is bounded. Callers that need an overall limit layer
/// a deadline over the install future.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}
