//! # crudgate - Mutation Dispatch Core
//!
//! crudgate is the create/update/delete core of a multi-backend database
//! gateway. A project may register several database connections, each under
//! an alias and each served by its own backend driver. Callers address a
//! mutation by `(alias, project, collection)`; the core does the rest:
//!
//! - **Resolution**: alias → binding (config, driver, backend type)
//! - **Validation**: delegated to the schema collaborator
//! - **Execution**: direct driver call, or a batched insert via the table's
//!   worker channel
//! - **Metering**: one metric record per successful mutation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        CrudModule (api)                         │
//! │          internal_create / internal_update / internal_delete    │
//! └───────┬──────────────────┬──────────────────────┬───────────────┘
//!         │                  │                      │
//!         ▼                  ▼                      ▼
//! ┌───────────────┐  ┌────────────────┐   ┌────────────────────────┐
//! │   Registry    │  │ SchemaValidator│   │   BatchCoordinator     │
//! │ alias→binding │  │  (external)    │   │ mpsc per table, oneshot│
//! └───────┬───────┘  └────────────────┘   │ per request            │
//!         │                               └───────────┬────────────┘
//!         ▼                                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Backend drivers (dyn Crud, external)               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Invariants
//!
//! 1. **One binding per alias**: enforced when bindings are registered
//! 2. **Short critical sections**: the registry lock is never held across I/O
//! 3. **One response per batch request**: answering consumes the request
//! 4. **Metric iff success**: the hook only runs after the driver succeeded
//! 5. **No retries**: every error reaches the caller unchanged
//!
//! ## Module Organization
//!
//! - [`error`]: Error type for every failure mode
//! - [`types`]: Backend/operation kinds, table keys, request shapes
//! - [`config`]: Database and module configuration, connection strings
//! - [`driver`]: Backend driver contract
//! - [`schema`]: Schema collaborator contract and schema document
//! - [`metrics`]: Metric sink contract
//! - [`registry`]: Alias → binding resolution
//! - [`batch`]: Producer side of the batched-insert protocol
//! - [`api`]: The internal operation pipeline (main entry point)

// =============================================================================
// Module Declarations
// =============================================================================

/// Error types for crudgate operations.
pub mod error;

/// Domain types shared by every stage of the pipeline.
pub mod types;

/// Configuration values and connection string handling.
pub mod config;

/// Backend driver contract.
pub mod driver;

/// Schema validation and where-clause normalization contract.
pub mod schema;

/// Metric reporting contract.
pub mod metrics;

/// Binding registry.
///
/// Maps aliases to their configuration, driver and backend type.
pub mod registry;

/// Batched inserts, producer side.
///
/// Looks up the pre-provisioned channel of a table, hands the documents to
/// its worker and waits for the single aggregated answer.
pub mod batch;

/// Internal operation pipeline.
///
/// The main entry point is [`CrudModule`](api::CrudModule).
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::CrudModule;
pub use batch::{BatchCoordinator, BatchReceiver, BatchRequest, BatchResponse, BatchSender};
pub use config::{split_connection_string, DatabaseConfig, ModuleConfig, SecretResolver};
pub use driver::{Crud, DriverHandle};
pub use error::{Error, ErrorKind, Result};
pub use metrics::{noop_metric_hook, MetricHook, MetricSink};
pub use registry::{Binding, Registry};
pub use schema::{SchemaDoc, SchemaHandle, SchemaValidator};
pub use types::{
    prepared_query_key, CreateRequest, DbType, DeleteRequest, Document, Filter, OperationKind,
    TableKey, UpdateRequest,
};
