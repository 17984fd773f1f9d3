//! Picks the latest release of a channel and the file to download from it.

use super::error::InstallError;
use crate::dotnet::metadata::{ComponentBuild, ReleaseFeedClient, ReleaseFile, ReleaseRecord};
use crate::dotnet::types::{ArtifactRequest, ArtifactType, ChannelVersion};

/// Latest release record of `channel`.
///
/// Fails with `ChannelNotFound` without touching the channel's release list
/// when the index has no such channel, and with `ReleaseNotFound` when the
/// list disagrees with the index about the latest release.
pub async fn resolve_latest(
    feed: &ReleaseFeedClient,
    channel: ChannelVersion,
) -> Result<ReleaseRecord, InstallError> {
    let index = feed.fetch_channel_index().await?;

    let entry = index
        .into_iter()
        .find(|entry| entry.channel_version == channel.as_str())
        .ok_or_else(|| {
            log::warn!("Failed to find release index for channel {}", channel);
            InstallError::ChannelNotFound {
                channel: channel.as_str().to_string(),
            }
        })?;

    log::debug!(
        "Channel {} latest release is {} ({})",
        channel,
        entry.latest_release,
        entry.release_index_url
    );

    let records = feed.fetch_release_records(&entry.release_index_url).await?;
    records
        .into_iter()
        .find(|record| record.release_version == entry.latest_release)
        .ok_or_else(|| {
            log::warn!(
                "Release {} of channel {} is missing from {}",
                entry.latest_release,
                channel,
                entry.release_index_url
            );
            InstallError::ReleaseNotFound {
                channel: channel.as_str().to_string(),
                release: entry.latest_release.clone(),
                url: entry.release_index_url.clone(),
            }
        })
}

pub fn component_build(record: &ReleaseRecord, artifact_type: ArtifactType) -> &ComponentBuild {
    match artifact_type {
        ArtifactType::Sdk => &record.sdk,
        ArtifactType::Runtime => &record.runtime,
        ArtifactType::AspNetRuntime => &record.aspnetcore_runtime,
    }
}

/// Version of the selected component itself. SDK, runtime and ASP.NET Core
/// runtime move on separate patch cadences within one release record.
///
/// The version names the install folder, so a record without a usable one
/// (component `null` or absent) is `ComponentNotFound`.
pub fn component_version(record: &ReleaseRecord, artifact_type: ArtifactType) -> Result<&str, InstallError> {
    let version = component_build(record, artifact_type).version.trim();
    if is_folder_name(version) {
        return Ok(version);
    }

    log::warn!(
        "Release {} has no usable {} version ({:?})",
        record.release_version,
        artifact_type.type_id(),
        version
    );
    Err(InstallError::ComponentNotFound {
        component: artifact_type.type_id().to_string(),
        release: record.release_version.clone(),
    })
}

fn is_folder_name(version: &str) -> bool {
    !version.is_empty() && version != "." && version != ".." && !version.contains(['/', '\\'])
}

/// File entry named exactly `{type}-{rid}{extension}`. No fuzzy matching.
pub fn select_download<'a>(
    record: &'a ReleaseRecord,
    request: &ArtifactRequest,
) -> Result<&'a ReleaseFile, InstallError> {
    let file_name = request.expected_file_name();
    log::trace!("File to download: {}", file_name);

    component_build(record, request.artifact_type)
        .files
        .iter()
        .find(|file| file.name == file_name)
        .ok_or_else(|| {
            log::warn!(
                "Failed to find {} in release {}",
                file_name,
                record.release_version
            );
            InstallError::FileNotFound {
                file_name,
                release: record.release_version.clone(),
            }
        })
}

pub fn select_download_url(
    record: &ReleaseRecord,
    request: &ArtifactRequest,
) -> Result<String, InstallError> {
    select_download(record, request).map(|file| file.url.clone())
}
