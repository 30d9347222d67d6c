//! # Schema Collaborator Contract
//!
//! Validation of requests and normalization of filters belong to the schema
//! subsystem. The pipeline hands it the parsed schema document together with
//! the resolved backend type and lets it accept, reject or rewrite.
//!
//! ```text
//!   create ─► validate_create_operation ─────────────► driver.create
//!   update ─► validate_update_operation ─► adjust_where_clause ─► driver.update
//!   delete ──────────────────────────────► adjust_where_clause ─► driver.delete
//! ```
//!
//! Rejections must be reported as
//! [`Error::ValidationFailed`](crate::Error::ValidationFailed); the pipeline
//! returns them to the caller unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{CreateRequest, DbType, Filter};

/// Parsed schema definitions: alias → collection → definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDoc {
    aliases: HashMap<String, HashMap<String, Value>>,
}

impl SchemaDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) the definition of a collection.
    pub fn insert(
        &mut self,
        db_alias: impl Into<String>,
        collection: impl Into<String>,
        definition: Value,
    ) {
        self.aliases
            .entry(db_alias.into())
            .or_default()
            .insert(collection.into(), definition);
    }

    /// Returns the definition of a collection, if any.
    pub fn collection(&self, db_alias: &str, collection: &str) -> Option<&Value> {
        self.aliases.get(db_alias)?.get(collection)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Validation and filter normalization, keyed by backend type.
pub trait SchemaValidator: Send + Sync {
    fn validate_create_operation(
        &self,
        db_alias: &str,
        db_type: DbType,
        collection: &str,
        schema: &SchemaDoc,
        req: &CreateRequest,
    ) -> Result<()>;

    #[allow(clippy::too_many_arguments)]
    fn validate_update_operation(
        &self,
        db_alias: &str,
        db_type: DbType,
        collection: &str,
        operation: &str,
        update: &Map<String, Value>,
        find: &Filter,
        schema: &SchemaDoc,
    ) -> Result<()>;

    /// Rewrites `find` in place into the backend's where-clause form.
    fn adjust_where_clause(
        &self,
        db_alias: &str,
        db_type: DbType,
        collection: &str,
        schema: &SchemaDoc,
        find: &mut Filter,
    ) -> Result<()>;
}

/// Shared handle to the schema collaborator.
pub type SchemaHandle = Arc<dyn SchemaValidator>;
