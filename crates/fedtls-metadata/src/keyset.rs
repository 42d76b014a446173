//! Trusted key set for signature verification.
//!
//! The federation distributes its signing keys as a JWK Set
//! (`{"keys": [...]}`). A single bare JWK object, or one or more PEM public
//! keys, are accepted too. The key set is loaded once per run and never
//! mutated.

use std::path::Path;
use std::str::FromStr;

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::envelope::CompactJws;
use crate::error::{MetadataError, MetadataResult};
use crate::verify::ProtectedHeader;

/// Cryptographic check of one compact JWS.
///
/// Implemented by [`KeySet`]; tests substitute counting doubles.
pub trait SignatureVerifier {
    /// Whether some trusted key verifies `jws` under the header's algorithm.
    fn verify(&self, jws: &CompactJws, header: &ProtectedHeader) -> bool;
}

/// Immutable set of trusted public keys.
pub struct KeySet {
    keys: Vec<TrustedKey>,
}

struct TrustedKey {
    kid: Option<String>,
    alg: Option<Algorithm>,
    key: DecodingKey,
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kids: Vec<&str> = self
            .keys
            .iter()
            .map(|k| k.kid.as_deref().unwrap_or("<no kid>"))
            .collect();
        f.debug_struct("KeySet").field("keys", &kids).finish()
    }
}

impl KeySet {
    /// Load a key set from a JWK Set, JWK or PEM file.
    pub async fn load(path: &Path) -> MetadataResult<Self> {
        let origin = path.display().to_string();
        let json = fs::read_to_string(path)
            .await
            .map_err(|e| MetadataError::KeySetUnreadable {
                origin: origin.clone(),
                message: e.to_string(),
            })?;

        let keys = parse_keys(&json)
            .map_err(|message| MetadataError::KeySetUnreadable { origin, message })?;
        debug!(path = %path.display(), keys = keys.len(), "loaded key set");
        Ok(Self { keys })
    }

    /// Parse a key set held in memory (JWK Set, JWK or PEM).
    pub fn from_json(json: &str) -> MetadataResult<Self> {
        let keys = parse_keys(json).map_err(|message| MetadataError::KeySetUnreadable {
            origin: "<memory>".to_string(),
            message,
        })?;
        Ok(Self { keys })
    }

    /// Number of usable keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys eligible for a header: keys without a `kid` always, keys with one
    /// only when it equals the header's `kid`. The key's declared `alg`, if
    /// any, must match.
    fn candidates<'a>(
        &'a self,
        kid: Option<&'a str>,
        alg: Algorithm,
    ) -> impl Iterator<Item = &'a TrustedKey> + 'a {
        self.keys.iter().filter(move |key| {
            let kid_ok = match (kid, key.kid.as_deref()) {
                (Some(wanted), Some(declared)) => wanted == declared,
                _ => true,
            };
            let alg_ok = key.alg.map_or(true, |declared| declared == alg);
            kid_ok && alg_ok
        })
    }
}

impl SignatureVerifier for KeySet {
    fn verify(&self, jws: &CompactJws, header: &ProtectedHeader) -> bool {
        let Some(alg_name) = header.alg.as_deref() else {
            debug!("protected header has no alg");
            return false;
        };
        let alg = match Algorithm::from_str(alg_name) {
            Ok(alg) => alg,
            Err(_) => {
                debug!(alg = alg_name, "unsupported signature algorithm");
                return false;
            }
        };

        self.candidates(header.kid.as_deref(), alg).any(|key| {
            match jsonwebtoken::crypto::verify(
                jws.signature(),
                jws.signing_input().as_bytes(),
                &key.key,
                alg,
            ) {
                Ok(valid) => valid,
                Err(e) => {
                    debug!(kid = ?key.kid, error = %e, "key cannot verify signature");
                    false
                }
            }
        })
    }
}

fn parse_keys(text: &str) -> Result<Vec<TrustedKey>, String> {
    if text.trim_start().starts_with(PEM_BEGIN) {
        return parse_pem_keys(text);
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| format!("invalid key set JSON: {}", e))?;

    let entries = match value.get("keys") {
        Some(Value::Array(keys)) => keys.clone(),
        Some(_) => return Err("\"keys\" must be an array".to_string()),
        None if value.get("kty").is_some() => vec![value],
        None => return Err("expected a JWK Set or a single JWK".to_string()),
    };

    let mut keys = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let kid = entry.get("kid").and_then(Value::as_str).map(String::from);

        if entry.get("use").and_then(Value::as_str) == Some("enc") {
            debug!(index, kid = ?kid, "skipping encryption key");
            continue;
        }

        let alg = match entry.get("alg").and_then(Value::as_str) {
            Some(name) => match Algorithm::from_str(name) {
                Ok(alg) => Some(alg),
                Err(_) => {
                    warn!(index, kid = ?kid, alg = name, "unsupported key algorithm, skipping");
                    continue;
                }
            },
            None => None,
        };

        let jwk: Jwk = match serde_json::from_value(entry) {
            Ok(jwk) => jwk,
            Err(e) => {
                warn!(index, kid = ?kid, error = %e, "failed to parse key, skipping");
                continue;
            }
        };

        match DecodingKey::from_jwk(&jwk) {
            Ok(key) => keys.push(TrustedKey { kid, alg, key }),
            Err(e) => {
                warn!(index, kid = ?kid, error = %e, "failed to decode key, skipping");
            }
        }
    }

    if keys.is_empty() {
        return Err("key set contains no usable keys".to_string());
    }
    Ok(keys)
}

const PEM_BEGIN: &str = "-----BEGIN";

/// Public keys in PEM form, one or more blocks. Each block may hold an
/// Ed25519, EC or RSA key; none carries a `kid` or `alg`.
fn parse_pem_keys(text: &str) -> Result<Vec<TrustedKey>, String> {
    let starts: Vec<usize> = text.match_indices(PEM_BEGIN).map(|(i, _)| i).collect();

    let mut keys = Vec::with_capacity(starts.len());
    for (index, &start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(text.len());
        let block = text[start..end].as_bytes();

        let decoded = DecodingKey::from_ed_pem(block)
            .or_else(|_| DecodingKey::from_ec_pem(block))
            .or_else(|_| DecodingKey::from_rsa_pem(block));
        match decoded {
            Ok(key) => keys.push(TrustedKey {
                kid: None,
                alg: None,
                key,
            }),
            Err(e) => {
                warn!(index, error = %e, "failed to decode PEM key, skipping");
            }
        }
    }

    if keys.is_empty() {
        return Err("PEM input contains no usable public keys".to_string());
    }
    Ok(keys)
}
