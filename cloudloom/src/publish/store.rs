//! The config store collaborator boundary.

use crate::errors::CloudloomError;
use async_trait::async_trait;
use dashmap::DashMap;

/// An entry held by a config store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// The stored value.
    pub value: String,
    /// Whether the entry is held on the encrypted-at-rest channel.
    pub encrypted: bool,
}

/// An external key-value config store.
///
/// Keys are namespaced paths such as `production/database/hostname`.
/// Writing an existing key overwrites it.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Writes one entry, plain or encrypted-at-rest.
    ///
    /// # Errors
    ///
    /// Returns a config store error on any collaborator failure.
    async fn put(&self, key: &str, value: &str, encrypted: bool) -> Result<(), CloudloomError>;

    /// Reads one entry's value.
    ///
    /// # Errors
    ///
    /// Returns a config store error on any collaborator failure.
    async fn get(&self, key: &str) -> Result<Option<String>, CloudloomError>;
}

/// An in-process config store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    entries: DashMap<String, StoredEntry>,
}

impl InMemoryConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the full entry for a key, encryption flag included.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the keys under a namespace prefix, sorted.
    #[must_use]
    pub fn keys_under(&self, namespace: &str) -> Vec<String> {
        let prefix = format!("{namespace}/");
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(&prefix))
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn put(&self, key: &str, value: &str, encrypted: bool) -> Result<(), CloudloomError> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                encrypted,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CloudloomError> {
        Ok(self.entries.get(key).map(|e| e.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = InMemoryConfigStore::new();
        store.put("production/database/hostname", "db.internal", false).await.unwrap();

        assert_eq!(
            store.get("production/database/hostname").await.unwrap(),
            Some("db.internal".to_string())
        );
        assert_eq!(store.get("production/database/port").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = InMemoryConfigStore::new();
        store.put("k", "first", false).await.unwrap();
        store.put("k", "second", false).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_encryption_flag_kept() {
        let store = InMemoryConfigStore::new();
        store.put("production/database/password", "s3cret", true).await.unwrap();

        let entry = store.entry("production/database/password").unwrap();
        assert!(entry.encrypted);
        assert_eq!(entry.value, "s3cret");
    }

    #[tokio::test]
    async fn test_keys_under_namespace() {
        let store = InMemoryConfigStore::new();
        store.put("production/database/hostname", "h", false).await.unwrap();
        store.put("production/database/port", "5432", false).await.unwrap();
        store.put("staging/database/hostname", "h2", false).await.unwrap();

        assert_eq!(
            store.keys_under("production/database"),
            vec![
                "production/database/hostname".to_string(),
                "production/database/port".to_string(),
            ]
        );
    }
}
