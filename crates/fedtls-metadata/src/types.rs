//! Configuration and request/response types for the fetcher.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, MetadataResult};

/// Default metadata location (Skolfederation / Kontosynk production feed).
pub const DEFAULT_METADATA_URL: &str = "https://md.swefed.se/kontosynk/kontosynk-prod-1.jws";

/// Fetcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Where the signed metadata is published.
    #[serde(default = "default_metadata_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound on the downloaded document size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: default_metadata_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl FetchConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `FEDTLS_METADATA_URL` | Metadata URL |
    /// | `FEDTLS_METADATA_TIMEOUT` | Request timeout in seconds (default: 30) |
    /// | `FEDTLS_METADATA_MAX_RETRIES` | Max retries for transient failures (default: 3) |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("FEDTLS_METADATA_URL").unwrap_or_else(|_| default_metadata_url()),
            timeout_secs: std::env::var("FEDTLS_METADATA_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("FEDTLS_METADATA_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
            max_body_bytes: default_max_body_bytes(),
        }
    }

    /// Set the metadata URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry budget for transient failures.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the maximum accepted document size.
    pub fn with_max_body_bytes(mut self, bytes: u64) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Reject configurations that can never succeed.
    pub fn validate(&self) -> MetadataResult<()> {
        let parsed = url::Url::parse(&self.url).map_err(|e| MetadataError::Config {
            message: format!("invalid metadata url {}: {}", self.url, e),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MetadataError::Config {
                message: format!("unsupported url scheme: {}", parsed.scheme()),
            });
        }
        if self.timeout_secs == 0 {
            return Err(MetadataError::Config {
                message: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

/// One `obtain` invocation.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// JWK Set file holding the trusted keys.
    pub keys: PathBuf,

    /// Where the verified metadata is written.
    pub output: PathBuf,

    /// Earlier verified metadata that may be reused while fresh.
    pub cached: Option<PathBuf>,
}

impl FetchRequest {
    pub fn new(keys: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            keys: keys.into(),
            output: output.into(),
            cached: None,
        }
    }

    /// Reuse `cached` when its cache TTL has not run out.
    pub fn with_cached(mut self, cached: impl Into<PathBuf>) -> Self {
        self.cached = Some(cached.into());
        self
    }
}

/// Where obtained metadata came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObtainSource {
    /// Copied from a fresh cached artifact.
    Cache(PathBuf),

    /// Downloaded and verified.
    Network(String),
}

impl std::fmt::Display for ObtainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache(path) => write!(f, "cache:{}", path.display()),
            Self::Network(url) => write!(f, "network:{}", url),
        }
    }
}

/// Result of a successful `obtain`.
#[derive(Debug, Clone)]
pub struct Obtained {
    /// Where the metadata came from.
    pub source: ObtainSource,

    /// Bytes now stored at the output path.
    pub bytes: Vec<u8>,

    /// Digest of `bytes` (sha256:...).
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.url, DEFAULT_METADATA_URL);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: FetchConfig =
            serde_json::from_str(r#"{"url": "https://md.example.org/feed.jws"}"#).unwrap();
        assert_eq!(config.url, "https://md.example.org/feed.jws");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = FetchConfig::default().with_url("not a url");
        assert!(matches!(
            config.validate(),
            Err(MetadataError::Config { .. })
        ));

        let config = FetchConfig::default().with_url("ftp://md.example.org/feed.jws");
        assert!(matches!(
            config.validate(),
            Err(MetadataError::Config { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = FetchConfig::default().with_timeout_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_obtain_source_display() {
        let source = ObtainSource::Network("https://md.example.org/feed.jws".to_string());
        assert_eq!(source.to_string(), "network:https://md.example.org/feed.jws");
        let source = ObtainSource::Cache(PathBuf::from("/var/cache/md.json"));
        assert_eq!(source.to_string(), "cache:/var/cache/md.json");
    }
}
