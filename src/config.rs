//! Configuration values consumed by the mutation core.
//!
//! [`DatabaseConfig`] describes one database connection as it appears in the
//! project configuration. [`ModuleConfig`] tunes the core itself. Both load
//! from JSON; bootstrap code owns where that JSON comes from.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::DbType;

// =============================================================================
// Connection Strings
// =============================================================================

/// Prefix marking a connection string as a secret-store reference.
pub const SECRETS_PREFIX: &str = "secrets";

/// Splits a connection string into `(secret_key, is_secret_reference)`.
///
/// `secrets.<key>` refers to an entry of the external secret store. Any other
/// value is a literal connection string and yields `("", false)`. Only the
/// segment right after `secrets.` is the key.
pub fn split_connection_string(connection: &str) -> (&str, bool) {
    let mut parts = connection.split('.');
    if parts.next() == Some(SECRETS_PREFIX) {
        if let Some(key) = parts.next() {
            return (key, true);
        }
    }
    ("", false)
}

/// Looks up secrets referenced by `secrets.<key>` connection strings.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Result<String>;
}

// =============================================================================
// Database Config
// =============================================================================

/// One database connection of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    pub db_alias: String,

    #[serde(rename = "type")]
    pub db_type: DbType,

    /// Literal connection string or `secrets.<key>`.
    pub conn: String,

    /// Disabled connections are never registered.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DatabaseConfig {
    pub fn new(db_alias: impl Into<String>, db_type: DbType, conn: impl Into<String>) -> Self {
        Self {
            db_alias: db_alias.into(),
            db_type,
            conn: conn.into(),
            enabled: true,
        }
    }

    /// Returns the literal connection string, resolving secret references.
    pub fn connection_string(&self, secrets: &dyn SecretResolver) -> Result<String> {
        match split_connection_string(&self.conn) {
            (key, true) => secrets.resolve(key),
            (_, false) => Ok(self.conn.clone()),
        }
    }

    /// Parses a list of database configs from JSON.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

// =============================================================================
// Module Config
// =============================================================================

/// Tuning for a [`CrudModule`](crate::CrudModule).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    /// Upper bound on how long a batched create waits for its worker.
    ///
    /// `None` waits as long as the worker takes.
    #[serde(default)]
    pub batch_response_timeout_ms: Option<u64>,
}

impl ModuleConfig {
    pub fn with_batch_response_timeout(timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Self {
            batch_response_timeout_ms: Some(millis),
        }
    }

    pub fn batch_response_timeout(&self) -> Option<Duration> {
        self.batch_response_timeout_ms.map(Duration::from_millis)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
