//! Error types for fetching and verifying metadata.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Metadata errors.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The metadata document could not be downloaded.
    #[error("failed to download metadata from {url}: {message}")]
    DownloadFailed { url: String, message: String },

    /// The downloaded document is not a JWS in general JSON serialization.
    #[error("malformed signed envelope: {message}")]
    MalformedEnvelope { message: String },

    /// No signature in the envelope was both unexpired and valid.
    #[error("failed to verify the signature: {}", summarize(.reasons))]
    VerificationFailed { reasons: Vec<RejectReason> },

    /// The trusted key set could not be loaded.
    #[error("failed to read key set from {origin}: {message}")]
    KeySetUnreadable { origin: String, message: String },

    /// A fresh cached artifact could not be copied to the output path.
    #[error("failed to copy cached version {} to {}: {message}", .from.display(), .to.display())]
    CacheCopyFailed {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    /// Verified metadata could not be written to the output path.
    #[error("failed to write verified metadata to {}: {message}", .path.display())]
    OutputWriteFailed { path: PathBuf, message: String },

    /// A cached artifact does not carry a readable `cache_ttl`.
    #[error("invalid cached artifact: {message}")]
    InvalidCachedArtifact { message: String },

    /// Verified metadata does not match the metadata model.
    #[error("invalid metadata: {message}")]
    InvalidMetadata { message: String },

    /// No entity with the requested id.
    #[error("entity not found in metadata: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// The entity has no server carrying all requested tags.
    #[error("no server of {entity_id} matches tags {tags:?}")]
    NoMatchingServer { entity_id: String, tags: Vec<String> },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl MetadataError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Fetch pipeline failures
            Self::DownloadFailed { .. } => 1,
            Self::MalformedEnvelope { .. } => 1,
            Self::VerificationFailed { .. } => 1,
            Self::KeySetUnreadable { .. } => 1,
            Self::OutputWriteFailed { .. } => 1,

            // Lookup failures
            Self::InvalidCachedArtifact { .. } => 1,
            Self::InvalidMetadata { .. } => 1,
            Self::EntityNotFound { .. } => 1,
            Self::NoMatchingServer { .. } => 1,

            // Cache reuse failed after the cache was judged fresh
            Self::CacheCopyFailed { .. } => 2,
            Self::Config { .. } => 2,
        }
    }
}

/// Why a single signature entry was not accepted.
///
/// Rejections are never fatal on their own; the orchestrator moves on to the
/// next entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// Protected header is not base64url-encoded JSON with a usable shape.
    #[error("malformed protected header: {0}")]
    MalformedHeader(String),

    /// Protected header carries no `exp` claim.
    #[error("protected header has no exp claim")]
    MissingExpiry,

    /// The signature's `exp` lies in the past.
    #[error("signature expired at {at}")]
    Expired { at: DateTime<Utc> },

    /// No trusted key verifies the signature.
    #[error("signature does not verify against the key set")]
    BadSignature,

    /// The payload could not be base64url-decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

fn summarize(reasons: &[RejectReason]) -> String {
    if reasons.is_empty() {
        return "envelope carries no signatures".to_string();
    }
    let parts: Vec<String> = reasons
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}", i, r))
        .collect();
    parts.join("; ")
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let download = MetadataError::DownloadFailed {
            url: "https://md.example.org/md.jws".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(download.exit_code(), 1);

        let copy = MetadataError::CacheCopyFailed {
            from: PathBuf::from("/tmp/a"),
            to: PathBuf::from("/tmp/b"),
            message: "permission denied".to_string(),
        };
        assert_eq!(copy.exit_code(), 2);

        let verify = MetadataError::VerificationFailed { reasons: vec![] };
        assert_eq!(verify.exit_code(), 1);
    }

    #[test]
    fn test_verification_failed_lists_reasons() {
        let err = MetadataError::VerificationFailed {
            reasons: vec![RejectReason::MissingExpiry, RejectReason::BadSignature],
        };
        let msg = err.to_string();
        assert!(msg.contains("[0] protected header has no exp claim"), "{msg}");
        assert!(msg.contains("[1] signature does not verify"), "{msg}");
    }

    #[test]
    fn test_verification_failed_without_signatures() {
        let err = MetadataError::VerificationFailed { reasons: vec![] };
        assert!(err.to_string().contains("no signatures"));
    }
}
