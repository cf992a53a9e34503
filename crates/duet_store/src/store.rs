//! Credential store collaborator.
//!
//! The vault only needs an async byte-oriented key-value store. Keys are
//! namespaced per alias `A`:
//!   salt:A, wrapped_exchange_key:A, wrapped_signing_key:A, password_hash:A
//!
//! `write_batch` MUST be atomic: either every entry lands or none does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    async fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// Write all entries atomically, in order.
    async fn write_batch(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).write(key, value).await
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        (**self).contains(key).await
    }

    async fn write_batch(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        (**self).write_batch(entries).await
    }
}

/// Store key names for one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeys {
    pub salt: String,
    pub wrapped_exchange_key: String,
    pub wrapped_signing_key: String,
    pub password_hash: String,
}

impl CredentialKeys {
    pub fn for_alias(alias: &str) -> Self {
        Self {
            salt: format!("salt:{alias}"),
            wrapped_exchange_key: format!("wrapped_exchange_key:{alias}"),
            wrapped_signing_key: format!("wrapped_signing_key:{alias}"),
            password_hash: format!("password_hash:{alias}"),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// Process-local store. Clone to share; all clones see the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails with `Unavailable` until
    /// switched back on.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check()?;
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        debug!(key, "memory store write");
        self.inner.write().await.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.inner.read().await.contains_key(key))
    }

    async fn write_batch(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        self.check()?;
        let mut guard = self.inner.write().await;
        for (key, value) in entries {
            debug!(key = key.as_str(), "memory store batch write");
            guard.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_write_contains() {
        let store = MemoryStore::new();
        assert!(!store.contains("k").await.unwrap());
        assert_eq!(store.read("k").await.unwrap(), None);

        store.write("k", b"v").await.unwrap();
        assert!(store.contains("k").await.unwrap());
        assert_eq!(store.read("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store
            .write_batch(&[("a".into(), vec![1]), ("b".into(), vec![2])])
            .await
            .unwrap();
        assert_eq!(other.len().await, 2);
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.read("k").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_available(true);
        assert!(store.read("k").await.is_ok());
    }

    #[test]
    fn keys_are_namespaced_per_alias() {
        let keys = CredentialKeys::for_alias("alice");
        assert_eq!(keys.salt, "salt:alice");
        assert_eq!(keys.wrapped_exchange_key, "wrapped_exchange_key:alice");
        assert_eq!(keys.wrapped_signing_key, "wrapped_signing_key:alice");
        assert_eq!(keys.password_hash, "password_hash:alice");
    }
}
