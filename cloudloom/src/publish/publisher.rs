//! The config publisher.

use crate::config::DatabaseConfig;
use crate::errors::CloudloomError;
use crate::events::{EventSink, NoOpEventSink, OrchestrationEvent};
use crate::publish::ConfigStore;
use std::sync::Arc;
use tracing::info;

/// One entry to publish under a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEntry {
    /// Key name under the namespace.
    pub name: String,
    /// The value to store.
    pub value: String,
    /// Whether the value goes over the encrypted-at-rest channel.
    pub encrypted: bool,
}

impl PublishedEntry {
    /// Creates a plain-text entry.
    #[must_use]
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            encrypted: false,
        }
    }

    /// Creates an encrypted-at-rest entry.
    #[must_use]
    pub fn encrypted(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            encrypted: true,
        }
    }
}

/// Publishes selected outputs to the external config store.
///
/// Republishing a namespace overwrites its entries rather than duplicating
/// them; the store keeps the latest value per key.
pub struct ConfigPublisher {
    store: Arc<dyn ConfigStore>,
    sink: Arc<dyn EventSink>,
}

impl ConfigPublisher {
    /// Creates a publisher over a config store.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Writes each entry under `namespace`, one store call per entry.
    ///
    /// # Errors
    ///
    /// Returns a config store error if any write fails.
    pub async fn publish(
        &self,
        namespace: &str,
        entries: &[PublishedEntry],
    ) -> Result<(), CloudloomError> {
        for entry in entries {
            let key = format!("{namespace}/{}", entry.name);
            self.store
                .put(&key, &entry.value, entry.encrypted)
                .await?;
        }
        info!(namespace, entries = entries.len(), "config namespace published");
        self.sink.try_emit(&OrchestrationEvent::ConfigPublished {
            namespace: namespace.to_string(),
            entries: entries.len(),
        });
        Ok(())
    }

    /// Publishes the resolved database config: six entries, one per field,
    /// the password on the encrypted channel.
    ///
    /// # Errors
    ///
    /// Returns a premature-access error if the endpoint is unresolved, and
    /// a config store error if any write fails.
    pub async fn publish_database(
        &self,
        namespace: &str,
        config: &DatabaseConfig,
    ) -> Result<(), CloudloomError> {
        let entries = [
            PublishedEntry::encrypted("password", &config.password),
            PublishedEntry::plain("username", &config.username),
            PublishedEntry::plain("hostname", config.hostname()?),
            PublishedEntry::plain("port", config.port()?.to_string()),
            PublishedEntry::plain("socketAddress", config.socket_address()?),
            PublishedEntry::plain("name", &config.database),
        ];
        self.publish(namespace, &entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseEndpoint, DEFAULT_DATABASE_PORT};
    use crate::events::CollectingEventSink;
    use crate::publish::InMemoryConfigStore;
    use pretty_assertions::assert_eq;

    fn resolved_config() -> DatabaseConfig {
        let mut config = DatabaseConfig::new("app_user", "s3cret", "app_db");
        config
            .resolve_endpoint(DatabaseEndpoint {
                hostname: "db.prod.internal".to_string(),
                port: DEFAULT_DATABASE_PORT,
                socket_address: "db.prod.internal:5432".to_string(),
            })
            .unwrap();
        config
    }

    #[tokio::test]
    async fn test_publish_database_writes_six_entries() {
        let store = Arc::new(InMemoryConfigStore::new());
        let publisher = ConfigPublisher::new(store.clone());

        publisher
            .publish_database("production/database", &resolved_config())
            .await
            .unwrap();

        assert_eq!(
            store.keys_under("production/database"),
            vec![
                "production/database/hostname".to_string(),
                "production/database/name".to_string(),
                "production/database/password".to_string(),
                "production/database/port".to_string(),
                "production/database/socketAddress".to_string(),
                "production/database/username".to_string(),
            ]
        );
        assert_eq!(
            store.get("production/database/hostname").await.unwrap(),
            Some("db.prod.internal".to_string())
        );
        assert_eq!(
            store.get("production/database/port").await.unwrap(),
            Some("5432".to_string())
        );

        // Only the password rides the encrypted channel.
        assert!(store.entry("production/database/password").unwrap().encrypted);
        assert!(!store.entry("production/database/username").unwrap().encrypted);
    }

    #[tokio::test]
    async fn test_publish_unresolved_config_fails() {
        let store = Arc::new(InMemoryConfigStore::new());
        let publisher = ConfigPublisher::new(store.clone());
        let config = DatabaseConfig::new("app_user", "s3cret", "app_db");

        let err = publisher
            .publish_database("production/database", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudloomError::PrematureOutputAccess(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_republish_overwrites() {
        let store = Arc::new(InMemoryConfigStore::new());
        let publisher = ConfigPublisher::new(store.clone());

        publisher
            .publish("production/database", &[PublishedEntry::plain("hostname", "old.internal")])
            .await
            .unwrap();
        publisher
            .publish("production/database", &[PublishedEntry::plain("hostname", "new.internal")])
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("production/database/hostname").await.unwrap(),
            Some("new.internal".to_string())
        );
    }

    #[tokio::test]
    async fn test_publish_emits_event() {
        let store = Arc::new(InMemoryConfigStore::new());
        let sink = Arc::new(CollectingEventSink::new());
        let publisher = ConfigPublisher::new(store).with_sink(sink.clone());

        publisher
            .publish_database("production/database", &resolved_config())
            .await
            .unwrap();

        assert_eq!(
            sink.events_named("config.published"),
            vec![OrchestrationEvent::ConfigPublished {
                namespace: "production/database".to_string(),
                entries: 6,
            }]
        );
    }
}
