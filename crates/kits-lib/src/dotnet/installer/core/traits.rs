use crate::dotnet::types::ProgressReporter;
use async_trait::async_trait;
use std::path::Path;

/// Failures talking to an HTTP endpoint
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SHA-512 mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },
}

/// HTTP access used by the feed client and archive acquisition.
/// Injected so both can be driven by fakes or a mock server.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` and return the whole body. Non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// GET `url` and stream the body into `destination` without buffering it
    /// in memory. Returns the number of bytes written.
    async fn stream_to_file(
        &self,
        url: &str,
        destination: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<u64, TransportError>;
}
