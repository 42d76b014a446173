//! Fetch-cache coordination.
//!
//! Decides between reusing a fresh cached copy and running the full
//! download → parse → verify → persist pipeline:
//!
//! 1. Cached artifact (if given, a regular file, and fresh per its `cache_ttl`)
//! 2. Network (download, verify against the key set, write atomically)
//!
//! There is no fallback between the two beyond this precedence: a failed
//! cache copy is not retried from the network, and a failed download never
//! falls back to a stale cache.

use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::client::MetadataClient;
use crate::envelope;
use crate::error::{MetadataError, MetadataResult};
use crate::freshness::{is_fresh, CachedArtifact};
use crate::io::{same_file, write_atomic};
use crate::keyset::KeySet;
use crate::types::{FetchConfig, FetchRequest, ObtainSource, Obtained};
use crate::verify::verify_envelope;

/// Compute `sha256:<hex>` of content bytes.
pub fn compute_digest(content: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(content)))
}

/// Obtains verified metadata, from cache when fresh or from the network.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: MetadataClient,
}

impl MetadataFetcher {
    /// Create a fetcher with custom configuration.
    pub fn new(config: FetchConfig) -> MetadataResult<Self> {
        Ok(Self {
            client: MetadataClient::new(config)?,
        })
    }

    /// Create a fetcher from environment configuration.
    pub fn from_env() -> MetadataResult<Self> {
        Self::new(FetchConfig::from_env())
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: MetadataClient) -> Self {
        Self { client }
    }

    /// Obtain verified metadata at `request.output` using the current time.
    pub async fn obtain(&self, request: &FetchRequest) -> MetadataResult<Obtained> {
        self.obtain_at(request, Utc::now()).await
    }

    /// Obtain verified metadata at `request.output`, judging freshness and
    /// signature expiry against `now`.
    pub async fn obtain_at(
        &self,
        request: &FetchRequest,
        now: DateTime<Utc>,
    ) -> MetadataResult<Obtained> {
        if let Some(cached_path) = &request.cached {
            if let Some(artifact) = CachedArtifact::load(cached_path).await {
                if is_fresh(&artifact, now) {
                    return self
                        .reuse_cached(cached_path, &request.output, artifact)
                        .await;
                }
                debug!(path = %cached_path.display(), "cached metadata is stale");
            }
        }

        self.fetch_and_verify(request, now).await
    }

    async fn reuse_cached(
        &self,
        cached_path: &Path,
        output: &Path,
        artifact: CachedArtifact,
    ) -> MetadataResult<Obtained> {
        let digest = compute_digest(&artifact.content);

        if same_file(cached_path, output).await {
            info!(path = %output.display(), "cached metadata still fresh, already in place");
        } else {
            write_atomic(output, &artifact.content)
                .await
                .map_err(|e| MetadataError::CacheCopyFailed {
                    from: cached_path.to_path_buf(),
                    to: output.to_path_buf(),
                    message: e.to_string(),
                })?;
            info!(
                from = %cached_path.display(),
                to = %output.display(),
                "reused fresh cached metadata"
            );
        }

        Ok(Obtained {
            source: ObtainSource::Cache(cached_path.to_path_buf()),
            bytes: artifact.content,
            digest,
        })
    }

    async fn fetch_and_verify(
        &self,
        request: &FetchRequest,
        now: DateTime<Utc>,
    ) -> MetadataResult<Obtained> {
        let keys = KeySet::load(&request.keys).await?;

        let raw = self.client.download().await?;
        let signed = envelope::parse(&raw)?;
        debug!(signatures = signed.signatures.len(), "parsed signed envelope");

        let verified = verify_envelope(&signed, &keys, now)?;
        let bytes = verified.into_bytes();

        write_atomic(&request.output, &bytes)
            .await
            .map_err(|e| MetadataError::OutputWriteFailed {
                path: request.output.clone(),
                message: e.to_string(),
            })?;

        let digest = compute_digest(&bytes);
        info!(
            url = %self.client.url(),
            output = %request.output.display(),
            digest = %digest,
            "verified and stored metadata"
        );

        Ok(Obtained {
            source: ObtainSource::Network(self.client.url().to_string()),
            bytes,
            digest,
        })
    }
}
