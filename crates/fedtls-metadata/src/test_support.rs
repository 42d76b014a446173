//! Shared fixtures for unit tests: Ed25519 signers and JWS building.

use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use pkcs8::{EncodePublicKey, LineEnding};
use serde_json::{json, Value};

use crate::envelope::{SignatureEntry, SignedEnvelope, BASE64URL};

pub(crate) struct TestSigner {
    pub(crate) kid: String,
    key: SigningKey,
}

impl TestSigner {
    pub(crate) fn generate(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    pub(crate) fn jwk(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "alg": "EdDSA",
            "kid": self.kid,
            "x": BASE64URL.encode(self.key.verifying_key().to_bytes()),
        })
    }

    /// SPKI PEM of the verifying key.
    pub(crate) fn public_key_pem(&self) -> String {
        self.key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap()
    }

    /// Sign `payload` with an `exp` claim in the protected header.
    pub(crate) fn entry(&self, payload: &str, exp: i64) -> SignatureEntry {
        self.entry_with_header(payload, json!({"alg": "EdDSA", "kid": self.kid, "exp": exp}))
    }

    pub(crate) fn entry_with_header(&self, payload: &str, header: Value) -> SignatureEntry {
        let protected = BASE64URL.encode(header.to_string());
        let signing_input = format!("{}.{}", protected, payload);
        let signature = self.key.sign(signing_input.as_bytes());
        SignatureEntry {
            protected,
            signature: BASE64URL.encode(signature.to_bytes()),
        }
    }
}

pub(crate) fn jwks(signers: &[&TestSigner]) -> String {
    let keys: Vec<Value> = signers.iter().map(|s| s.jwk()).collect();
    json!({ "keys": keys }).to_string()
}

pub(crate) fn encode_payload(bytes: &[u8]) -> String {
    BASE64URL.encode(bytes)
}

/// A complete envelope signed by each signer with the same `exp`.
pub(crate) fn signed_envelope(document: &[u8], signers: &[&TestSigner], exp: i64) -> SignedEnvelope {
    let payload = encode_payload(document);
    SignedEnvelope {
        signatures: signers.iter().map(|s| s.entry(&payload, exp)).collect(),
        payload,
    }
}
