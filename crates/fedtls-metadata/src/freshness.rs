//! Cache freshness of previously verified metadata.
//!
//! A persisted document declares its own lifetime through `cache_ttl`
//! (seconds, default one hour). It stays usable while
//! `stored_at + cache_ttl > now`, where `stored_at` is the file's
//! modification time. Trust is not re-checked on reuse; it was established
//! when the document was verified and written.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MetadataError, MetadataResult};

/// TTL applied when a document does not declare `cache_ttl`.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct CacheTtl {
    #[serde(default = "default_cache_ttl")]
    cache_ttl: u64,
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// Verified metadata as found in storage.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    /// Stored bytes.
    pub content: Vec<u8>,

    /// When the bytes were stored (file modification time).
    pub stored_at: DateTime<Utc>,
}

impl CachedArtifact {
    /// Read an artifact and its modification time.
    ///
    /// Returns `None` when `path` does not name a regular file or cannot be
    /// read; the caller falls back to fetching.
    pub async fn load(path: &Path) -> Option<Self> {
        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no cached artifact");
                return None;
            }
        };
        if !metadata.is_file() {
            debug!(path = %path.display(), "cached path is not a regular file");
            return None;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cached artifact has no mtime");
                return None;
            }
        };

        match fs::read(path).await {
            Ok(content) => Some(Self {
                content,
                stored_at: DateTime::<Utc>::from(modified),
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cached artifact");
                None
            }
        }
    }

    /// The lifetime declared by the artifact's own content.
    pub fn cache_ttl(&self) -> MetadataResult<Duration> {
        let value: serde_json::Value = serde_json::from_slice(&self.content).map_err(|e| {
            MetadataError::InvalidCachedArtifact {
                message: format!("content is not JSON: {}", e),
            }
        })?;
        if !value.is_object() {
            return Err(MetadataError::InvalidCachedArtifact {
                message: "content is not a JSON object".to_string(),
            });
        }

        let parsed: CacheTtl =
            serde_json::from_value(value).map_err(|e| MetadataError::InvalidCachedArtifact {
                message: format!("invalid cache_ttl: {}", e),
            })?;
        let secs = i64::try_from(parsed.cache_ttl).map_err(|_| {
            MetadataError::InvalidCachedArtifact {
                message: format!("cache_ttl out of range: {}", parsed.cache_ttl),
            }
        })?;
        Duration::try_seconds(secs).ok_or_else(|| MetadataError::InvalidCachedArtifact {
            message: format!("cache_ttl out of range: {}", secs),
        })
    }

    /// Instant after which the artifact must be refetched.
    pub fn expires_at(&self) -> MetadataResult<DateTime<Utc>> {
        let ttl = self.cache_ttl()?;
        self.stored_at
            .checked_add_signed(ttl)
            .ok_or_else(|| MetadataError::InvalidCachedArtifact {
                message: "cache expiry overflows".to_string(),
            })
    }
}

/// Whether `artifact` may be reused instead of fetching at `now`.
///
/// Content without a readable `cache_ttl` is never fresh.
pub fn is_fresh(artifact: &CachedArtifact, now: DateTime<Utc>) -> bool {
    match artifact.expires_at() {
        Ok(expires_at) => {
            let fresh = expires_at > now;
            debug!(
                stored_at = %artifact.stored_at,
                expires_at = %expires_at,
                fresh,
                "evaluated cache freshness"
            );
            fresh
        }
        Err(e) => {
            warn!(error = %e, "cached artifact unusable, refetching");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn artifact(content: &str) -> CachedArtifact {
        CachedArtifact {
            content: content.as_bytes().to_vec(),
            stored_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_declared_ttl_window() {
        let cached = artifact(r#"{"cache_ttl": 10, "entities": []}"#);
        let stored = cached.stored_at;

        assert!(is_fresh(&cached, stored + Duration::seconds(5)));
        assert!(!is_fresh(&cached, stored + Duration::seconds(15)));
    }

    #[test]
    fn test_ttl_boundary_is_stale() {
        let cached = artifact(r#"{"cache_ttl": 10}"#);
        let stored = cached.stored_at;

        assert!(is_fresh(&cached, stored + Duration::seconds(9)));
        assert!(!is_fresh(&cached, stored + Duration::seconds(10)));
    }

    #[test]
    fn test_default_ttl_is_one_hour() {
        let cached = artifact(r#"{"version": "1.0.0"}"#);
        let stored = cached.stored_at;

        assert_eq!(cached.cache_ttl().unwrap(), Duration::seconds(3600));
        assert!(is_fresh(&cached, stored + Duration::seconds(3599)));
        assert!(!is_fresh(&cached, stored + Duration::seconds(3600)));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let cached = artifact(r#"{"cache_ttl": 0}"#);
        assert!(!is_fresh(&cached, cached.stored_at));
    }

    #[test]
    fn test_non_json_is_not_fresh() {
        let cached = artifact("<html>captive portal</html>");
        assert!(matches!(
            cached.cache_ttl(),
            Err(MetadataError::InvalidCachedArtifact { .. })
        ));
        assert!(!is_fresh(&cached, cached.stored_at));
    }

    #[test]
    fn test_invalid_ttl_is_not_fresh() {
        for content in [
            r#"{"cache_ttl": "3600"}"#,
            r#"{"cache_ttl": -5}"#,
            r#"{"cache_ttl": 1.5}"#,
            r#"[10]"#,
        ] {
            let cached = artifact(content);
            assert!(cached.cache_ttl().is_err(), "{content} should be rejected");
            assert!(!is_fresh(&cached, cached.stored_at), "{content} must not be fresh");
        }
    }

    #[test]
    fn test_huge_ttl_is_rejected() {
        let cached = artifact(&format!(r#"{{"cache_ttl": {}}}"#, u64::MAX));
        assert!(cached.cache_ttl().is_err());
        assert!(!is_fresh(&cached, cached.stored_at));
    }

    #[tokio::test]
    async fn test_load_reads_content_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, r#"{"cache_ttl": 3600}"#).unwrap();

        let before = Utc::now() - Duration::seconds(5);
        let cached = CachedArtifact::load(&path).await.unwrap();
        assert_eq!(cached.content, br#"{"cache_ttl": 3600}"#);
        assert!(cached.stored_at >= before);
        assert!(is_fresh(&cached, Utc::now()));
    }

    #[tokio::test]
    async fn test_load_missing_or_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CachedArtifact::load(&dir.path().join("absent.json"))
            .await
            .is_none());
        assert!(CachedArtifact::load(dir.path()).await.is_none());
    }
}
