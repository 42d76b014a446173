//! Signature evaluation and verification of multi-signature envelopes.
//!
//! Each signature entry is judged on its own:
//!
//! 1. Decode the protected header and read `exp`
//! 2. Reject expired entries without touching the key set
//! 3. Verify the compact JWS against the key set
//! 4. Decode the payload
//!
//! The orchestrator walks the entries in document order and accepts the first
//! one that passes. This supports key and algorithm rotation: an authority
//! publishes parallel signatures and any single valid, unexpired one is proof
//! of authenticity.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::envelope::{SignatureEntry, SignedEnvelope, BASE64URL};
use crate::error::{MetadataError, MetadataResult, RejectReason};
use crate::keyset::SignatureVerifier;

/// Fields of the protected header the evaluator relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtectedHeader {
    /// JWS algorithm, e.g. `ES256`.
    #[serde(default)]
    pub alg: Option<String>,

    /// Identifier of the signing key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Unix seconds after which this signature is expired.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl ProtectedHeader {
    /// Decode a base64url protected header.
    pub fn decode(encoded: &str) -> Result<Self, RejectReason> {
        let bytes = BASE64URL
            .decode(encoded)
            .map_err(|e| RejectReason::MalformedHeader(format!("invalid base64url: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RejectReason::MalformedHeader(format!("invalid JSON: {}", e)))
    }
}

/// Payload bytes whose authenticity has been established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayload {
    bytes: Vec<u8>,
    index: usize,
    expires_at: DateTime<Utc>,
}

impl VerifiedPayload {
    /// The decoded payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Position of the accepted signature in the envelope. Always 0 for a
    /// payload returned by [`evaluate`] directly.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Expiry of the signature that vouched for the payload.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Outcome of evaluating one signature entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Valid(VerifiedPayload),
    Rejected(RejectReason),
}

/// Evaluate a single signature entry against the shared payload.
///
/// The expiry check runs first; an expired entry never reaches `keys`.
pub fn evaluate(
    entry: &SignatureEntry,
    payload: &str,
    keys: &dyn SignatureVerifier,
    now: DateTime<Utc>,
) -> Evaluation {
    let compact = entry.compact(payload);

    let header = match ProtectedHeader::decode(compact.protected()) {
        Ok(header) => header,
        Err(reason) => return Evaluation::Rejected(reason),
    };

    let Some(exp) = header.exp else {
        return Evaluation::Rejected(RejectReason::MissingExpiry);
    };
    let Some(expires_at) = DateTime::<Utc>::from_timestamp(exp, 0) else {
        return Evaluation::Rejected(RejectReason::MalformedHeader(format!(
            "exp out of range: {}",
            exp
        )));
    };
    if expires_at < now {
        return Evaluation::Rejected(RejectReason::Expired { at: expires_at });
    }

    if !keys.verify(&compact, &header) {
        return Evaluation::Rejected(RejectReason::BadSignature);
    }

    match BASE64URL.decode(compact.payload()) {
        Ok(bytes) => Evaluation::Valid(VerifiedPayload {
            bytes,
            index: 0,
            expires_at,
        }),
        Err(e) => Evaluation::Rejected(RejectReason::MalformedPayload(e.to_string())),
    }
}

/// Verify an envelope: the first entry that evaluates as valid wins.
///
/// Entries after the winner are never evaluated. Fails with
/// [`MetadataError::VerificationFailed`] once all entries are rejected.
pub fn verify_envelope(
    envelope: &SignedEnvelope,
    keys: &dyn SignatureVerifier,
    now: DateTime<Utc>,
) -> MetadataResult<VerifiedPayload> {
    let mut reasons = Vec::with_capacity(envelope.signatures.len());

    for (index, entry) in envelope.signatures.iter().enumerate() {
        match evaluate(entry, &envelope.payload, keys, now) {
            Evaluation::Valid(mut payload) => {
                payload.index = index;
                debug!(
                    index,
                    expires_at = %payload.expires_at(),
                    "signature verified"
                );
                return Ok(payload);
            }
            Evaluation::Rejected(reason) => {
                warn!(index, reason = %reason, "signature rejected");
                reasons.push(reason);
            }
        }
    }

    Err(MetadataError::VerificationFailed { reasons })
}
