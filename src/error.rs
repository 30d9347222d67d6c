//! # Error Handling for crudgate
//!
//! This module defines the error type used throughout the mutation core. A
//! single enum ([`Error`]) covers every failure mode, so callers of the
//! pipeline can match on one type no matter which stage rejected a request.
//!
//! ## Rust Pattern: thiserror
//!
//! We use the `thiserror` crate to derive `std::error::Error` implementations.
//! The `#[error(...)]` attributes generate the `Display` impl, which is also
//! what ends up in the structured log fields at the pipeline boundary.
//!
//! ## Error Categories
//!
//! | Category | Examples | Typical Response |
//! |----------|----------|------------------|
//! | Resolution | Unknown alias, missing batch channel | Fix configuration |
//! | Request | Bad document shape, schema rejection | Fix the request |
//! | Backend | Unsafe client, driver failure | Log, surface to caller |
//! | Batching | Timeout, worker gone | Retry at the caller's discretion |
//!
//! Nothing inside the core retries. Every variant is handed back to the
//! immediate caller unchanged.

use thiserror::Error;

// =============================================================================
// Error Type
// =============================================================================

/// All errors that can occur while dispatching a mutation.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Resolution Errors
    // =========================================================================

    /// No registered binding carries the requested alias.
    ///
    /// This is an expected outcome (a caller referencing a database that was
    /// never added, or was removed by a reload), not a defect.
    #[error("database alias '{alias}' does not exist")]
    BindingNotFound {
        /// The alias that failed to resolve
        alias: String,
    },

    /// A batched create targeted a table with no provisioned worker channel.
    ///
    /// Batch requests are only possible for tables that were explicitly set
    /// up for batching ahead of time. The core never creates workers lazily.
    #[error(
        "cannot find batch channel for project '{project}', database '{db_alias}' & collection '{collection}'"
    )]
    ChannelNotConfigured {
        /// Project owning the table
        project: String,
        /// Database alias of the table
        db_alias: String,
        /// Collection (table) name
        collection: String,
    },

    // =========================================================================
    // Request Errors
    // =========================================================================

    /// The create payload was neither an object nor an array of objects.
    #[error("cannot create batch request: unsupported document type ({found})")]
    UnsupportedDocumentType {
        /// JSON type name of the rejected payload
        found: &'static str,
    },

    /// The schema collaborator rejected the request.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================

    /// The driver's readiness check failed.
    #[error("database client is not safe to use: {0}")]
    UnsafeClient(String),

    /// The driver failed while executing a create, update or delete.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    // =========================================================================
    // Batching Errors
    // =========================================================================

    /// The batch worker did not answer within the configured timeout.
    ///
    /// The timeout does not cancel the write. The worker may still write the
    /// documents after this is returned; only its late reply is refused.
    #[error("timed out after {timeout_ms}ms waiting for batch worker of collection '{collection}'")]
    BatchTimeout {
        /// Collection whose worker timed out
        collection: String,
        /// Timeout that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// The batch worker dropped the table channel or the request itself.
    #[error("batch worker for collection '{collection}' has shut down")]
    BatchWorkerGone {
        /// Collection whose worker is gone
        collection: String,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================

    /// A binding with this alias is already registered.
    #[error("database alias '{alias}' is already registered")]
    DuplicateAlias {
        /// The conflicting alias
        alias: String,
    },

    /// Malformed configuration value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// Error Kind
// =============================================================================

/// Field-free discriminant of [`Error`].
///
/// Used as a stable label in log fields and wherever callers want to branch
/// on the failure class without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BindingNotFound,
    ChannelNotConfigured,
    UnsupportedDocumentType,
    ValidationFailed,
    UnsafeClient,
    ExecutionFailed,
    BatchTimeout,
    BatchWorkerGone,
    DuplicateAlias,
    InvalidConfig,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BindingNotFound => "binding_not_found",
            ErrorKind::ChannelNotConfigured => "channel_not_configured",
            ErrorKind::UnsupportedDocumentType => "unsupported_document_type",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::UnsafeClient => "unsafe_client",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::BatchTimeout => "batch_timeout",
            ErrorKind::BatchWorkerGone => "batch_worker_gone",
            ErrorKind::DuplicateAlias => "duplicate_alias",
            ErrorKind::InvalidConfig => "invalid_config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Returns the discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BindingNotFound { .. } => ErrorKind::BindingNotFound,
            Error::ChannelNotConfigured { .. } => ErrorKind::ChannelNotConfigured,
            Error::UnsupportedDocumentType { .. } => ErrorKind::UnsupportedDocumentType,
            Error::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Error::UnsafeClient(_) => ErrorKind::UnsafeClient,
            Error::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            Error::BatchTimeout { .. } => ErrorKind::BatchTimeout,
            Error::BatchWorkerGone { .. } => ErrorKind::BatchWorkerGone,
            Error::DuplicateAlias { .. } => ErrorKind::DuplicateAlias,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    pub(crate) fn binding_not_found(alias: &str) -> Self {
        Error::BindingNotFound {
            alias: alias.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A `Result` type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let missing = Error::binding_not_found("main");
        assert_eq!(missing.to_string(), "database alias 'main' does not exist");

        let channel = Error::ChannelNotConfigured {
            project: "projA".to_string(),
            db_alias: "main".to_string(),
            collection: "users".to_string(),
        };
        assert_eq!(
            channel.to_string(),
            "cannot find batch channel for project 'projA', database 'main' & collection 'users'"
        );

        let shape = Error::UnsupportedDocumentType { found: "string" };
        assert_eq!(
            shape.to_string(),
            "cannot create batch request: unsupported document type (string)"
        );

        let timeout = Error::BatchTimeout {
            collection: "users".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(
            timeout.to_string(),
            "timed out after 250ms waiting for batch worker of collection 'users'"
        );
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(
            Error::binding_not_found("x").kind(),
            ErrorKind::BindingNotFound
        );
        assert_eq!(
            Error::ValidationFailed("bad".into()).kind().as_str(),
            "validation_failed"
        );
        assert_eq!(
            Error::DuplicateAlias { alias: "x".into() }.kind().to_string(),
            "duplicate_alias"
        );
    }
}
