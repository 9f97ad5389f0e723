use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, Utc};

use crate::gateway::{ArtifactRef, RetrievalUrl, StorageError, StorageGateway};

/// In-memory content-addressable store.
///
/// Intended for tests/dev. URLs it mints are synthetic (`memory://` scheme)
/// but carry real expiry timestamps.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<ArtifactRef, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }
}

impl StorageGateway for InMemoryStorage {
    fn put(&self, bytes: &[u8]) -> Result<ArtifactRef, StorageError> {
        let artifact = ArtifactRef::for_content(bytes);
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        objects.entry(artifact).or_insert_with(|| bytes.to_vec());
        Ok(artifact)
    }

    fn get(&self, artifact: ArtifactRef) -> Result<Vec<u8>, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        objects
            .get(&artifact)
            .cloned()
            .ok_or(StorageError::UnknownRef(artifact))
    }

    fn get_url(&self, artifact: ArtifactRef, ttl: Duration) -> Result<RetrievalUrl, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        if !objects.contains_key(&artifact) {
            return Err(StorageError::UnknownRef(artifact));
        }
        Ok(RetrievalUrl {
            url: format!("memory://artifacts/{artifact}"),
            expires_at: Utc::now() + ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent_for_identical_content() {
        let store = InMemoryStorage::new();
        let a = store.put(b"same bytes").unwrap();
        let b = store.put(b"same bytes").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.object_count(), 1);
    }

    #[test]
    fn get_round_trips_stored_bytes() {
        let store = InMemoryStorage::new();
        let artifact = store.put(b"pdf body").unwrap();
        assert_eq!(store.get(artifact).unwrap(), b"pdf body");
    }

    #[test]
    fn get_url_requires_a_stored_object() {
        let store = InMemoryStorage::new();
        let missing = ArtifactRef::for_content(b"never stored");
        assert_eq!(
            store.get_url(missing, Duration::minutes(15)),
            Err(StorageError::UnknownRef(missing))
        );

        let artifact = store.put(b"stored").unwrap();
        let url = store.get_url(artifact, Duration::minutes(15)).unwrap();
        assert!(url.url.contains(&artifact.to_string()));
        assert!(url.expires_at > Utc::now());
    }
}
