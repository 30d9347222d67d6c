//! # Domain Types for crudgate
//!
//! This module defines the values that flow through the mutation pipeline:
//! backend kinds, operation kinds, table keys, and the three request shapes.
//!
//! ## Design Philosophy: Closed Enums at the Edges
//!
//! Backend and operation kinds arrive as strings in configuration and leave
//! as strings in metrics. Inside the crate they are enums, so a typo becomes
//! a parse error at load time instead of a silent mismatch at dispatch time.
//!
//! Documents and filters stay as `serde_json` values. Their structure belongs
//! to the schema collaborator and the drivers, not to this core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A single document payload.
pub type Document = Map<String, Value>;

/// A generic filter expression ("where clause" once normalized).
pub type Filter = Map<String, Value>;

// =============================================================================
// Backend Type
// =============================================================================

/// The kind of database a binding targets.
///
/// Selects validation behavior in the schema collaborator and is passed
/// through to it untouched. The pipeline itself never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Postgres,
    Mysql,
    SqlServer,
    Mongo,
    Embedded,
}

impl DbType {
    /// Returns the canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::Mysql => "mysql",
            DbType::SqlServer => "sqlserver",
            DbType::Mongo => "mongo",
            DbType::Embedded => "embedded",
        }
    }

    /// True for relational backends.
    pub fn is_sql(self) -> bool {
        matches!(self, DbType::Postgres | DbType::Mysql | DbType::SqlServer)
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "postgres" => Ok(DbType::Postgres),
            "mysql" => Ok(DbType::Mysql),
            "sqlserver" => Ok(DbType::SqlServer),
            "mongo" => Ok(DbType::Mongo),
            "embedded" => Ok(DbType::Embedded),
            other => Err(Error::InvalidConfig(format!("unknown db type '{}'", other))),
        }
    }
}

// =============================================================================
// Operation Kind
// =============================================================================

/// The kind of operation reported to the metric sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Read,
    List,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::List => "list",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Table Key
// =============================================================================

/// Identifies one table across all projects and aliases.
///
/// This is the key under which batch channels are provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub project: String,
    pub db_alias: String,
    pub collection: String,
}

impl TableKey {
    pub fn new(
        project: impl Into<String>,
        db_alias: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            db_alias: db_alias.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.db_alias, self.collection)
    }
}

/// Key under which a prepared query of an alias is stored.
pub fn prepared_query_key(db_alias: &str, id: &str) -> String {
    format!("{}--{}", db_alias, id)
}

// =============================================================================
// Requests
// =============================================================================

/// Operation modifier: act on a single record.
pub const OP_ONE: &str = "one";

/// Operation modifier: act on every matching record.
pub const OP_ALL: &str = "all";

/// Operation modifier: update or insert.
pub const OP_UPSERT: &str = "upsert";

/// Insert one or more documents.
///
/// `document` is either a single object or an array of objects. When
/// `is_batch` is set the insert is routed through the table's batch worker
/// instead of calling the driver directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub document: Value,
    #[serde(rename = "op")]
    pub operation: String,
    #[serde(default)]
    pub is_batch: bool,
}

impl CreateRequest {
    /// Creates a non-batched request.
    pub fn new(document: Value) -> Self {
        let operation = if document.is_array() { OP_ALL } else { OP_ONE };
        Self {
            document,
            operation: operation.to_string(),
            is_batch: false,
        }
    }

    /// Marks the request for batched insertion.
    pub fn batched(mut self) -> Self {
        self.is_batch = true;
        self
    }
}

/// Update the records matching `find`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub find: Filter,
    #[serde(rename = "op")]
    pub operation: String,
    pub update: Map<String, Value>,
}

impl UpdateRequest {
    pub fn new(operation: impl Into<String>, find: Filter, update: Map<String, Value>) -> Self {
        Self {
            find,
            operation: operation.into(),
            update,
        }
    }
}

/// Delete the records matching `find`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub find: Filter,
    #[serde(rename = "op")]
    pub operation: String,
}

impl DeleteRequest {
    pub fn new(operation: impl Into<String>, find: Filter) -> Self {
        Self {
            find,
            operation: operation.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
