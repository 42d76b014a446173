//! Client for federated TLS authentication metadata.
//!
//! A federation operator publishes its metadata as a signed JWS document
//! (general JSON serialization). This crate provides:
//!
//! - HTTP download with retry and body limits
//! - Signature verification against a trusted JWK Set, honoring per-signature
//!   expiry (`exp` in the protected header)
//! - Reuse of a fresh cached copy, judged by the document's own `cache_ttl`
//! - Atomic persistence of the verified document
//! - Lookup of server base URIs, pinned public keys and CA bundles
//!
//! # Quick Start
//!
//! ```no_run
//! use fedtls_metadata::{FetchRequest, Metadata, MetadataFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = MetadataFetcher::from_env()?;
//! let request = FetchRequest::new("jwks.json", "metadata.json").with_cached("metadata.json");
//!
//! let obtained = fetcher.obtain(&request).await?;
//! println!("metadata from {} ({})", obtained.source, obtained.digest);
//!
//! let metadata = Metadata::from_slice(&obtained.bytes)?;
//! let server = metadata.server_by_tags("https://school.example.se", &[])?;
//! println!("{} pinned to {}", server.base_uri, server.pinned_public_keys());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `FEDTLS_METADATA_URL` | Signed metadata URL (default: `https://md.swefed.se/kontosynk/kontosynk-prod-1.jws`) |
//! | `FEDTLS_METADATA_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `FEDTLS_METADATA_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod client;
pub mod envelope;
pub mod error;
pub mod fetcher;
pub mod freshness;
mod io;
pub mod keyset;
pub mod metadata;
pub mod types;
pub mod verify;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use client::{MetadataClient, METADATA_USER_AGENT};
pub use envelope::{parse, CompactJws, SignatureEntry, SignedEnvelope};
pub use error::{MetadataError, MetadataResult, RejectReason};
pub use fetcher::{compute_digest, MetadataFetcher};
pub use freshness::{is_fresh, CachedArtifact, DEFAULT_CACHE_TTL_SECS};
pub use keyset::{KeySet, SignatureVerifier};
pub use metadata::{parse_tags, Endpoint, Entity, Issuer, Metadata, Pin, ServerConnection};
pub use types::{FetchConfig, FetchRequest, ObtainSource, Obtained, DEFAULT_METADATA_URL};
pub use verify::{evaluate, verify_envelope, Evaluation, ProtectedHeader, VerifiedPayload};
