//! The migration-runner collaborator boundary.

use crate::errors::CloudloomError;
use crate::publish::ConfigStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Environment variable names the migration runner consumes.
pub const ENV_DB_USER: &str = "DB_USER";
/// Database password variable.
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
/// Database hostname variable.
pub const ENV_DB_HOST: &str = "DB_HOST";
/// Database port variable.
pub const ENV_DB_PORT: &str = "DB_PORT";
/// Database name variable.
pub const ENV_DB_NAME: &str = "DB_NAME";

/// The connection environment handed to the external migration runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationEnv {
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database hostname.
    pub host: String,
    /// Database port.
    pub port: String,
    /// Database name.
    pub name: String,
}

impl MigrationEnv {
    /// Loads the environment from a published database namespace.
    ///
    /// # Errors
    ///
    /// Returns a config store error if the namespace is incomplete.
    pub async fn from_store(
        store: &dyn ConfigStore,
        namespace: &str,
    ) -> Result<Self, CloudloomError> {
        let fetch = |key: &'static str| async move {
            store
                .get(&format!("{namespace}/{key}"))
                .await?
                .ok_or_else(|| {
                    CloudloomError::ConfigStore(format!("missing entry '{namespace}/{key}'"))
                })
        };
        Ok(Self {
            user: fetch("username").await?,
            password: fetch("password").await?,
            host: fetch("hostname").await?,
            port: fetch("port").await?,
            name: fetch("name").await?,
        })
    }

    /// Returns the `DB_*` process environment pairs.
    #[must_use]
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        vec![
            (ENV_DB_USER.to_string(), self.user.clone()),
            (ENV_DB_PASSWORD.to_string(), self.password.clone()),
            (ENV_DB_HOST.to_string(), self.host.clone()),
            (ENV_DB_PORT.to_string(), self.port.clone()),
            (ENV_DB_NAME.to_string(), self.name.clone()),
        ]
    }
}

/// An external process that applies database migrations.
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// Runs migrations from `migrations_dir` against the given connection
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the runner reports failure.
    async fn run(&self, env: &MigrationEnv, migrations_dir: &Path) -> Result<(), CloudloomError>;
}

/// Runs a migration command as a child process with the `DB_*` environment.
#[derive(Debug, Clone)]
pub struct ProcessMigrationRunner {
    command: String,
    args: Vec<String>,
}

impl ProcessMigrationRunner {
    /// Creates a runner invoking `command` with `args`.
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl MigrationRunner for ProcessMigrationRunner {
    async fn run(&self, env: &MigrationEnv, migrations_dir: &Path) -> Result<(), CloudloomError> {
        let status = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .envs(env.to_env_vars())
            .env("MIGRATIONS_DIR", migrations_dir)
            .status()
            .await
            .map_err(|e| {
                CloudloomError::Internal(format!("failed to start migration runner: {e}"))
            })?;
        if !status.success() {
            return Err(CloudloomError::Internal(format!(
                "migration runner exited with {status}"
            )));
        }
        Ok(())
    }
}

/// A runner that records invocations, for tests.
#[derive(Debug, Default)]
pub struct RecordingMigrationRunner {
    runs: RwLock<Vec<(MigrationEnv, PathBuf)>>,
}

impl RecordingMigrationRunner {
    /// Creates a new recording runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded invocations.
    #[must_use]
    pub fn runs(&self) -> Vec<(MigrationEnv, PathBuf)> {
        self.runs.read().clone()
    }
}

#[async_trait]
impl MigrationRunner for RecordingMigrationRunner {
    async fn run(&self, env: &MigrationEnv, migrations_dir: &Path) -> Result<(), CloudloomError> {
        self.runs
            .write()
            .push((env.clone(), migrations_dir.to_path_buf()));
        Ok(())
    }
}
