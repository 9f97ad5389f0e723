use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Which artifact slot of a version a reference fills.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Structured report body (machine-readable findings).
    Body,
    /// Rendered PDF; the canonical deliverable.
    Pdf,
    /// HTML rendering for in-browser viewing.
    Html,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Body => "body",
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Html => "html",
        }
    }
}

impl core::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable, content-derived reference to a stored blob.
///
/// SHA-256 of the content truncated to 128 bits. The same bytes always yield
/// the same reference, so re-uploading an identical artifact is a no-op and
/// references can be compared without touching the store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(Uuid);

impl ArtifactRef {
    /// Derive the reference for a blob's content.
    pub fn for_content(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hash = hasher.finalize();

        // SHA-256 always yields 32 bytes; the first 16 form the reference.
        let truncated: [u8; 16] = hash[..16].try_into().unwrap_or([0u8; 16]);
        Self(Uuid::from_bytes(truncated))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A time-limited retrieval URL minted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Infrastructure failures at the storage boundary.
///
/// Deliberately a separate type from `DomainError`: a version without a PDF
/// pointer is a data fact (`NotFound` upstream), an unreachable store is an
/// outage and must not masquerade as one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage gateway unavailable: {0}")]
    Unavailable(String),

    /// The store has no object for a reference that should resolve.
    #[error("no stored object for reference {0}")]
    UnknownRef(ArtifactRef),
}

/// Content-addressable blob store.
pub trait StorageGateway: Send + Sync {
    /// Store bytes, returning their stable reference. Idempotent for
    /// identical content.
    fn put(&self, bytes: &[u8]) -> Result<ArtifactRef, StorageError>;

    /// Fetch the bytes behind a reference.
    fn get(&self, artifact: ArtifactRef) -> Result<Vec<u8>, StorageError>;

    /// Mint a time-limited retrieval URL for a reference.
    fn get_url(&self, artifact: ArtifactRef, ttl: Duration) -> Result<RetrievalUrl, StorageError>;
}
