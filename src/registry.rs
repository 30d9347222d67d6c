//! # Binding Registry
//!
//! The registry maps database aliases to the connection that serves them.
//! Each entry ([`Binding`]) carries the parsed configuration, the backend
//! type and a handle to the driver.
//!
//! ## Ownership
//!
//! A [`Registry`] is a plain value with no interior locking. The only shared
//! instance lives inside [`CrudModule`](crate::CrudModule), behind the
//! module's `RwLock`, so every read and every reconfiguration goes through a
//! guard. Code holding a `&Registry` therefore already holds the lock.
//!
//! ## Uniqueness
//!
//! Aliases are unique. [`Registry::register`] rejects a second binding for an
//! alias that is already present, which keeps resolution deterministic: an
//! alias resolves to exactly one binding or to
//! [`Error::BindingNotFound`].
//!
//! Disabled connections never enter a registry. `from_bindings` drops them
//! and `register` refuses them.
//!
//! ## The `sql-` Prefix
//!
//! Older configurations spelled SQL aliases as `sql-<alias>`. Backend-type
//! resolution strips that prefix so both spellings agree. Config and driver
//! resolution do not.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::driver::DriverHandle;
use crate::error::{Error, Result};
use crate::types::DbType;

/// Historical prefix of SQL aliases.
pub const SQL_ALIAS_PREFIX: &str = "sql-";

// =============================================================================
// Binding
// =============================================================================

/// One registered database connection.
///
/// Cloning is cheap: config and driver are shared.
#[derive(Clone)]
pub struct Binding {
    alias: String,
    db_type: DbType,
    config: Arc<DatabaseConfig>,
    driver: DriverHandle,
}

impl Binding {
    /// Builds a binding from a connection config and the driver serving it.
    ///
    /// Alias and backend type are taken from the config.
    pub fn new(config: DatabaseConfig, driver: DriverHandle) -> Self {
        Self {
            alias: config.db_alias.clone(),
            db_type: config.db_type,
            config: Arc::new(config),
            driver,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    pub fn config(&self) -> &Arc<DatabaseConfig> {
        &self.config
    }

    pub fn driver(&self) -> &DriverHandle {
        &self.driver
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("alias", &self.alias)
            .field("db_type", &self.db_type)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// All bindings known to one module instance.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    bindings: HashMap<String, Binding>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a list of bindings, failing on the first
    /// duplicate alias. Bindings whose config is disabled are skipped.
    pub fn from_bindings(bindings: impl IntoIterator<Item = Binding>) -> Result<Self> {
        let mut registry = Self::new();
        for binding in bindings.into_iter().filter(|b| b.config.enabled) {
            registry.register(binding)?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.bindings.contains_key(alias)
    }

    /// Returns the registered aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.bindings.keys().map(|s| s.as_str()).collect();
        aliases.sort_unstable();
        aliases
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Adds a binding. Fails if its alias is already taken or its config is
    /// disabled.
    pub fn register(&mut self, binding: Binding) -> Result<()> {
        if !binding.config.enabled {
            return Err(Error::InvalidConfig(format!(
                "database alias '{}' is disabled",
                binding.alias
            )));
        }
        if self.bindings.contains_key(binding.alias()) {
            return Err(Error::DuplicateAlias {
                alias: binding.alias,
            });
        }
        self.bindings.insert(binding.alias.clone(), binding);
        Ok(())
    }

    /// Removes and returns the binding of an alias.
    pub fn remove(&mut self, alias: &str) -> Result<Binding> {
        self.bindings
            .remove(alias)
            .ok_or_else(|| Error::binding_not_found(alias))
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolves the full binding of an alias.
    pub fn resolve(&self, alias: &str) -> Result<&Binding> {
        self.bindings
            .get(alias)
            .ok_or_else(|| Error::binding_not_found(alias))
    }

    /// Resolves the configuration of an alias.
    pub fn config(&self, alias: &str) -> Result<Arc<DatabaseConfig>> {
        self.resolve(alias).map(|b| Arc::clone(&b.config))
    }

    /// Resolves the driver of an alias.
    pub fn driver(&self, alias: &str) -> Result<DriverHandle> {
        self.resolve(alias).map(|b| Arc::clone(&b.driver))
    }

    /// Resolves the backend type of an alias, ignoring a leading `sql-`.
    pub fn db_type(&self, alias: &str) -> Result<DbType> {
        let alias = alias.strip_prefix(SQL_ALIAS_PREFIX).unwrap_or(alias);
        self.resolve(alias).map(|b| b.db_type)
    }
}

// =============================================================================
// Tests
// =============================================================================
