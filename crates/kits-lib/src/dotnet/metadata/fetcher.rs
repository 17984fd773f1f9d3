use super::types::*;
use crate::dotnet::installer::config::DOTNET_RELEASES_INDEX_URL;
use crate::dotnet::installer::core::traits::{HttpTransport, TransportError};
use crate::dotnet::installer::error::InstallError;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Reads the two-level .NET release feed. Nothing is cached; every call hits
/// the feed so results always reflect upstream.
#[derive(Clone)]
pub struct ReleaseFeedClient {
    transport: Arc<dyn HttpTransport>,
    index_url: String,
}

impl ReleaseFeedClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_index_url(transport, DOTNET_RELEASES_INDEX_URL)
    }

    pub fn with_index_url(transport: Arc<dyn HttpTransport>, index_url: impl Into<String>) -> Self {
        Self {
            transport,
            index_url: index_url.into(),
        }
    }

    pub fn with_url(mut self, index_url: impl Into<String>) -> Self {
        self.index_url = index_url.into();
        self
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// One entry per channel, in feed order
    pub async fn fetch_channel_index(&self) -> Result<Vec<ReleaseIndexEntry>, InstallError> {
        let index: ReleaseIndex = self.fetch_json(&self.index_url).await?;
        log::debug!("Release index lists {} channels", index.entries.len());
        Ok(index.entries)
    }

    /// Every release of the channel whose `releases.json` lives at `url`
    pub async fn fetch_release_records(&self, url: &str) -> Result<Vec<ReleaseRecord>, InstallError> {
        let releases: ChannelReleases = self.fetch_json(url).await?;
        log::debug!("{} lists {} releases", url, releases.releases.len());
        Ok(releases.releases)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, InstallError> {
        let feed_unavailable = |source: TransportError| {
            log::warn!("Failed to receive release metadata from {}: {}", url, source);
            InstallError::FeedUnavailable {
                url: url.to_string(),
                source,
            }
        };

        let body = self.transport.fetch(url).await.map_err(feed_unavailable)?;
        serde_json::from_slice(&body).map_err(|source| {
            feed_unavailable(TransportError::Parse {
                url: url.to_string(),
                source,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dotnet::installer::config::TransportConfig;
    use crate::dotnet::installer::core::downloader::ReqwestTransport;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ReleaseFeedClient {
        let transport = Arc::new(ReqwestTransport::new(&TransportConfig::default()).unwrap());
        ReleaseFeedClient::with_index_url(transport, format!("{}/releases-index.json", server.uri()))
    }

    #[tokio::test]
    async fn fetches_channel_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases-index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "releases-index": [
                    {
                        "channel-version": "9.0",
                        "latest-release": "9.0.0",
                        "releases.json": "https://example.com/9.0/releases.json",
                        "product": ".NET"
                    },
                    {
                        "channel-version": "8.0",
                        "latest-release": "8.0.11",
                        "releases.json": "https://example.com/8.0/releases.json"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let entries = client(&server).fetch_channel_index().await.unwrap();
        let channels: Vec<_> = entries.iter().map(|e| e.channel_version.as_str()).collect();
        assert_eq!(channels, vec!["9.0", "8.0"]);
    }

    #[tokio::test]
    async fn non_success_status_is_feed_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).fetch_channel_index().await.unwrap_err();
        assert!(matches!(
            err,
            InstallError::FeedUnavailable {
                source: TransportError::Status { status: 503, .. },
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_body_is_feed_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/8.0/releases.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/8.0/releases.json", server.uri());
        let err = client(&server).fetch_release_records(&url).await.unwrap_err();
        assert!(matches!(
            err,
            InstallError::FeedUnavailable {
                source: TransportError::Parse { .. },
                ..
            }
        ));
    }
}
