//! Download client for signed metadata.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::types::FetchConfig;

mod http;

use http::HttpBackend;

/// User-Agent sent with every download.
pub const METADATA_USER_AGENT: &str = concat!("fedtls-metadata/", env!("CARGO_PKG_VERSION"));

/// Client for downloading signed metadata documents.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: HttpBackend,
}

impl MetadataClient {
    pub fn new(config: FetchConfig) -> MetadataResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(METADATA_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| MetadataError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend { client, config },
        })
    }

    pub fn from_env() -> MetadataResult<Self> {
        Self::new(FetchConfig::from_env())
    }

    /// The configured metadata URL.
    pub fn url(&self) -> &str {
        &self.http.config.url
    }

    /// Download the raw signed document from the configured URL.
    pub async fn download(&self) -> MetadataResult<Vec<u8>> {
        let url = self.url();
        debug!(url = %url, "downloading metadata");

        self.http
            .get_bytes(url)
            .await
            .map_err(|e| MetadataError::DownloadFailed {
                url: url.to_string(),
                message: e.message,
            })
    }
}
