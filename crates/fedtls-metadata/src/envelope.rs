//! JWS general JSON serialization.
//!
//! The federation publishes its metadata as one payload shared by several
//! independent signatures:
//!
//! ```text
//! {
//!   "payload": "<base64url>",
//!   "signatures": [
//!     { "protected": "<base64url JSON header>", "signature": "<base64url>" }
//!   ]
//! }
//! ```
//!
//! Parsing makes no trust decisions and does not decode any base64url part.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, MetadataResult};

/// base64url decoder that accepts input with or without padding.
pub(crate) const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A multi-signature JWS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// base64url-encoded payload shared by all signatures.
    pub payload: String,

    /// Candidate signatures in document order.
    pub signatures: Vec<SignatureEntry>,
}

/// One signature over the shared payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    /// base64url-encoded JSON protected header.
    pub protected: String,

    /// base64url-encoded signature value.
    pub signature: String,
}

impl SignatureEntry {
    /// Join this entry with `payload` into `protected.payload.signature`.
    pub fn compact(&self, payload: &str) -> CompactJws {
        CompactJws::new(&self.protected, payload, &self.signature)
    }
}

/// The dot-joined form consumed by signature verifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactJws {
    serialized: String,
    protected_len: usize,
    signing_input_len: usize,
}

impl CompactJws {
    pub fn new(protected: &str, payload: &str, signature: &str) -> Self {
        let serialized = format!("{}.{}.{}", protected, payload, signature);
        Self {
            protected_len: protected.len(),
            signing_input_len: protected.len() + 1 + payload.len(),
            serialized,
        }
    }

    /// Full `protected.payload.signature` string.
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// The encoded protected header.
    pub fn protected(&self) -> &str {
        &self.serialized[..self.protected_len]
    }

    /// The encoded payload.
    pub fn payload(&self) -> &str {
        &self.serialized[self.protected_len + 1..self.signing_input_len]
    }

    /// `protected.payload`, the bytes covered by the signature.
    pub fn signing_input(&self) -> &str {
        &self.serialized[..self.signing_input_len]
    }

    /// The encoded signature.
    pub fn signature(&self) -> &str {
        &self.serialized[self.signing_input_len + 1..]
    }
}

impl std::fmt::Display for CompactJws {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialized)
    }
}

/// Parse a downloaded document into a [`SignedEnvelope`].
pub fn parse(raw: &[u8]) -> MetadataResult<SignedEnvelope> {
    serde_json::from_slice(raw).map_err(|e| MetadataError::MalformedEnvelope {
        message: e.to_string(),
    })
}
