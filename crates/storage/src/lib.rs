//! Content-addressable blob storage boundary.
//!
//! Report versions never hold bytes, only [`ArtifactRef`] pointers into the
//! storage gateway. The gateway is an external collaborator (S3 or similar
//! in production); an in-memory implementation backs tests and dev.

pub mod gateway;
pub mod memory;

pub use gateway::{ArtifactKind, ArtifactRef, RetrievalUrl, StorageError, StorageGateway};
pub use memory::InMemoryStorage;
