//! Typed view of verified federation metadata.
//!
//! The verified payload lists the federation's entities. Each entity carries
//! the CA certificates (issuers) its TLS endpoints chain to, and servers and
//! clients identified by tags and pinned public keys.

use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, MetadataResult};

/// Federation metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Metadata schema version.
    #[serde(default)]
    pub version: Option<String>,

    /// Declared cache lifetime in seconds.
    #[serde(default)]
    pub cache_ttl: Option<u64>,

    /// Federation members.
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// A federation member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,

    #[serde(default)]
    pub organization: Option<String>,

    /// CAs that issue the entity's TLS certificates.
    #[serde(default)]
    pub issuers: Vec<Issuer>,

    #[serde(default)]
    pub servers: Vec<Endpoint>,

    #[serde(default)]
    pub clients: Vec<Endpoint>,
}

/// Issuer certificate in PEM form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    pub x509certificate: String,
}

/// A server or client endpoint of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub description: Option<String>,

    /// Base URI (servers only).
    #[serde(default)]
    pub base_uri: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub pins: Vec<Pin>,
}

/// Public key pin: digest of the endpoint certificate's SubjectPublicKeyInfo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// Digest algorithm, `sha256`.
    pub alg: String,

    /// base64-encoded digest.
    pub digest: String,
}

impl Pin {
    /// curl's `CURLOPT_PINNEDPUBLICKEY` form, e.g. `sha256//<digest>`.
    pub fn curl_pin(&self) -> String {
        format!("{}//{}", self.alg, self.digest)
    }
}

/// What a client needs to connect to one server of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConnection {
    pub entity_id: String,
    pub base_uri: String,
    pub pins: Vec<Pin>,
    pub issuers: Vec<Issuer>,
}

impl ServerConnection {
    /// All pins joined with `;`, as accepted by curl.
    pub fn pinned_public_keys(&self) -> String {
        self.pins
            .iter()
            .map(Pin::curl_pin)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Issuer certificates concatenated into one PEM CA bundle.
    pub fn ca_bundle(&self) -> String {
        let mut bundle = String::new();
        for issuer in &self.issuers {
            bundle.push_str(issuer.x509certificate.trim_end());
            bundle.push('\n');
        }
        bundle
    }
}

impl Metadata {
    /// Parse verified metadata.
    pub fn from_slice(bytes: &[u8]) -> MetadataResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| MetadataError::InvalidMetadata {
            message: e.to_string(),
        })
    }

    /// Find an entity by id.
    pub fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.entity_id == entity_id)
    }

    /// First server of `entity_id` that carries every tag in `tags` and has a
    /// base URI.
    pub fn server_by_tags(
        &self,
        entity_id: &str,
        tags: &[String],
    ) -> MetadataResult<ServerConnection> {
        let entity = self
            .entity(entity_id)
            .ok_or_else(|| MetadataError::EntityNotFound {
                entity_id: entity_id.to_string(),
            })?;

        let (server, base_uri) = entity
            .servers
            .iter()
            .filter(|server| tags.iter().all(|tag| server.tags.contains(tag)))
            .find_map(|server| server.base_uri.as_ref().map(|uri| (server, uri)))
            .ok_or_else(|| MetadataError::NoMatchingServer {
                entity_id: entity_id.to_string(),
                tags: tags.to_vec(),
            })?;

        Ok(ServerConnection {
            entity_id: entity.entity_id.clone(),
            base_uri: base_uri.clone(),
            pins: server.pins.clone(),
            issuers: entity.issuers.clone(),
        })
    }
}

/// Split a comma separated tag specification, dropping empty segments.
pub fn parse_tags(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}
