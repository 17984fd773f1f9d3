//! Wire types for the .NET release metadata feed.
//!
//! Every struct ignores unknown fields; the feed is third-party and gains
//! fields without notice.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level `releases-index.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseIndex {
    #[serde(rename = "releases-index", default)]
    pub entries: Vec<ReleaseIndexEntry>,
}

/// One channel row of the top-level index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseIndexEntry {
    #[serde(rename = "channel-version")]
    pub channel_version: String,

    #[serde(rename = "latest-release")]
    pub latest_release: String,

    /// URL of the channel's detailed release list
    #[serde(rename = "releases.json")]
    pub release_index_url: String,
}

/// Per-channel `releases.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelReleases {
    #[serde(default)]
    pub releases: Vec<ReleaseRecord>,
}

/// One published release within a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRecord {
    #[serde(rename = "release-version")]
    pub release_version: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sdk: ComponentBuild,

    #[serde(default, deserialize_with = "null_as_default")]
    pub runtime: ComponentBuild,

    #[serde(
        rename = "aspnetcore-runtime",
        default,
        deserialize_with = "null_as_default"
    )]
    pub aspnetcore_runtime: ComponentBuild,
}

// Older records publish `null` for components they did not ship
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Version and file list of one component (SDK, runtime, ASP.NET Core runtime)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentBuild {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub files: Vec<ReleaseFile>,
}

/// A downloadable file, named `{type}-{rid}{extension}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub name: String,
    pub url: String,

    /// SHA-512 of the file, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}
