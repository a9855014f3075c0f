//! Explicit deployment configuration.
//!
//! Region, account, environment flags and database settings are threaded
//! into the orchestrator entry point as a value, not read from ambient
//! process state, so runs are reproducible and testable with injected
//! configuration.

use crate::errors::{CloudloomError, PrematureOutputAccessError};
use serde::{Deserialize, Serialize};

/// Default port for the managed postgres database. The provider-reported
/// port value is unusable (a sentinel), so the engine pins the real one.
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// Configuration for one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Environment name, used as the config namespace root.
    pub environment: String,
    /// Provider region.
    pub region: String,
    /// Provider account id.
    pub account: String,
    /// Owner label, applied as a tag on every declared node.
    pub owner: String,
    /// Image repository reference for the compute service and pipeline.
    pub image_repository: String,
    /// Application database user.
    pub database_user: String,
    /// Application database password, sourced from the caller.
    pub database_password: String,
    /// Application database name.
    pub database_name: String,
    /// Fully qualified domain name for the public DNS record.
    pub domain_name: String,
}

impl DeploymentConfig {
    /// Returns the namespace prefix database entries are published under.
    #[must_use]
    pub fn database_namespace(&self) -> String {
        format!("{}/database", self.environment)
    }

    /// Builds the authoritative database config from this deployment's
    /// settings, endpoint unresolved.
    #[must_use]
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(
            &self.database_user,
            &self.database_password,
            &self.database_name,
        )
    }
}

/// The resolved endpoint of a Ready database node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEndpoint {
    /// The allocated hostname.
    pub hostname: String,
    /// The connection port.
    pub port: u16,
    /// The `host:port` socket address.
    pub socket_address: String,
}

/// The distinguished database output bundle.
///
/// Credentials are known at declaration time; the endpoint fields are
/// populated only after the Database node reaches Ready. Reading them early
/// fails with a premature output access error, never a silent default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Application user name.
    pub username: String,
    /// Application user password.
    pub password: String,
    /// Database name.
    pub database: String,
    endpoint: Option<DatabaseEndpoint>,
}

impl DatabaseConfig {
    /// Creates a database config with an unresolved endpoint.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            database: database.into(),
            endpoint: None,
        }
    }

    /// Returns true once the endpoint has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Resolves the endpoint, write-once.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConstructed` if the endpoint was already resolved; a
    /// created database's endpoint never changes.
    pub fn resolve_endpoint(&mut self, endpoint: DatabaseEndpoint) -> Result<(), CloudloomError> {
        if self.endpoint.is_some() {
            return Err(CloudloomError::AlreadyConstructed {
                node: "database".to_string(),
            });
        }
        self.endpoint = Some(endpoint);
        Ok(())
    }

    /// Reads the allocated hostname.
    ///
    /// # Errors
    ///
    /// Returns [`PrematureOutputAccessError`] while the endpoint is
    /// unresolved.
    pub fn hostname(&self) -> Result<&str, PrematureOutputAccessError> {
        self.endpoint
            .as_ref()
            .map(|e| e.hostname.as_str())
            .ok_or_else(|| Self::premature("hostname"))
    }

    /// Reads the connection port.
    ///
    /// # Errors
    ///
    /// Returns [`PrematureOutputAccessError`] while the endpoint is
    /// unresolved.
    pub fn port(&self) -> Result<u16, PrematureOutputAccessError> {
        self.endpoint
            .as_ref()
            .map(|e| e.port)
            .ok_or_else(|| Self::premature("port"))
    }

    /// Reads the socket address.
    ///
    /// # Errors
    ///
    /// Returns [`PrematureOutputAccessError`] while the endpoint is
    /// unresolved.
    pub fn socket_address(&self) -> Result<&str, PrematureOutputAccessError> {
        self.endpoint
            .as_ref()
            .map(|e| e.socket_address.as_str())
            .ok_or_else(|| Self::premature("socketAddress"))
    }

    fn premature(field: &str) -> PrematureOutputAccessError {
        PrematureOutputAccessError::new("database", field, "Pending")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> DeploymentConfig {
        DeploymentConfig {
            environment: "production".to_string(),
            region: "eu-central-1".to_string(),
            account: "123456789012".to_string(),
            owner: "platform-team".to_string(),
            image_repository: "registry.internal/backend".to_string(),
            database_user: "app_database_user".to_string(),
            database_password: "s3cret".to_string(),
            database_name: "app_database".to_string(),
            domain_name: "api.example.com".to_string(),
        }
    }

    #[test]
    fn test_database_namespace() {
        assert_eq!(config().database_namespace(), "production/database");
    }

    #[test]
    fn test_endpoint_reads_fail_before_resolution() {
        let db = config().database_config();
        assert!(!db.is_resolved());
        assert!(db.hostname().is_err());
        assert!(db.port().is_err());
        assert!(db.socket_address().is_err());
    }

    #[test]
    fn test_endpoint_resolution_is_write_once() {
        let mut db = config().database_config();
        db.resolve_endpoint(DatabaseEndpoint {
            hostname: "db.prod.internal".to_string(),
            port: DEFAULT_DATABASE_PORT,
            socket_address: "db.prod.internal:5432".to_string(),
        })
        .unwrap();

        assert_eq!(db.hostname().unwrap(), "db.prod.internal");
        assert_eq!(db.port().unwrap(), 5432);

        let err = db
            .resolve_endpoint(DatabaseEndpoint {
                hostname: "other".to_string(),
                port: 1,
                socket_address: "other:1".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, CloudloomError::AlreadyConstructed { .. }));
        // The original endpoint is untouched.
        assert_eq!(db.hostname().unwrap(), "db.prod.internal");
    }
}
