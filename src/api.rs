//! # Internal Mutation API
//!
//! This module provides [`CrudModule`], the entry point trusted internal
//! callers (the eventing subsystem, for instance) use to create, update and
//! delete records without going through the public hook chain.
//!
//! ## Pipeline
//!
//! ```text
//!   internal_create            internal_update             internal_delete
//!   ───────────────            ───────────────             ───────────────
//!   resolve db type            resolve db type             resolve driver
//!   validate create            validate update             is_client_safe
//!   resolve driver             resolve driver              resolve db type
//!   is_client_safe             is_client_safe              adjust where clause
//!   batch? ─► coordinator      adjust where clause         driver.delete
//!        └──► driver.create    driver.update               metric (update)
//!   metric (create)            metric (update)
//! ```
//!
//! Every stage returns its error unchanged and stops the pipeline. The metric
//! hook runs only when the driver (or batch worker) reported success.
//!
//! ## Locking
//!
//! Registry and schema document live behind one `RwLock`. An operation takes
//! the read lock just long enough to copy what it needs (backend type,
//! driver handle, schema document) and then runs validation and I/O without
//! it. Reconfiguration takes the write lock and is never stalled by a slow
//! driver call.
//!
//! ```text
//!   ┌──────────── read lock ────────────┐
//!   │ db_type, driver, schema (Arc)     │──► validate ─► safety ─► execute
//!   └───────────────────────────────────┘        (no lock held)
//! ```
//!
//! The lock is a `parking_lot::RwLock`, whose guards are `!Send`. Holding
//! one across an `.await` makes the operation's future `!Send`, so the
//! compiler rejects a critical section that spans I/O.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::batch::BatchCoordinator;
use crate::config::ModuleConfig;
use crate::driver::DriverHandle;
use crate::error::{Error, Result};
use crate::metrics::MetricHook;
use crate::registry::{Binding, Registry};
use crate::schema::{SchemaDoc, SchemaHandle};
use crate::types::{CreateRequest, DbType, DeleteRequest, OperationKind, TableKey, UpdateRequest};

// =============================================================================
// Module State
// =============================================================================

/// Everything reconfiguration may replace.
#[derive(Debug, Default)]
struct ModuleState {
    registry: Registry,
    schema_doc: Arc<SchemaDoc>,
}

/// What an operation copies out of the state before running unlocked.
///
/// Resolution results are kept as `Result`s so each pipeline can surface a
/// missing alias at the stage where it checks it.
struct Snapshot {
    db_type: Result<DbType>,
    driver: Result<DriverHandle>,
    schema_doc: Arc<SchemaDoc>,
}

struct Inner {
    project: String,
    state: RwLock<ModuleState>,
    batch: BatchCoordinator,
    schema: SchemaHandle,
    metrics: MetricHook,
}

// =============================================================================
// CrudModule
// =============================================================================

/// Mutation dispatcher for one project.
///
/// `CrudModule` is `Clone`, `Send` and `Sync`. All clones share the same
/// registry, schema document and batch channels.
///
/// # Example
///
/// ```rust,ignore
/// let module = CrudModule::new("projA", schema, metrics, ModuleConfig::default());
/// module.set_bindings(vec![Binding::new(config, driver)])?;
///
/// let n = module
///     .internal_create("main", "projA", "users", CreateRequest::new(doc), false)
///     .await?;
/// ```
#[derive(Clone)]
pub struct CrudModule {
    inner: Arc<Inner>,
}

impl CrudModule {
    /// Creates a module with an empty registry.
    pub fn new(
        project: impl Into<String>,
        schema: SchemaHandle,
        metrics: MetricHook,
        config: ModuleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                project: project.into(),
                state: RwLock::new(ModuleState::default()),
                batch: BatchCoordinator::new(config.batch_response_timeout()),
                schema,
                metrics,
            }),
        }
    }

    pub fn project(&self) -> &str {
        &self.inner.project
    }

    /// The batch coordinator, for attaching and detaching worker channels.
    pub fn batch(&self) -> &BatchCoordinator {
        &self.inner.batch
    }

    // =========================================================================
    // Reconfiguration (write lock)
    // =========================================================================

    /// Replaces every binding at once.
    ///
    /// On a duplicate alias nothing changes and the error is returned.
    pub fn set_bindings(&self, bindings: impl IntoIterator<Item = Binding>) -> Result<()> {
        let registry = Registry::from_bindings(bindings)?;
        let count = registry.len();

        self.inner.state.write().registry = registry;

        info!(project = %self.inner.project, bindings = count, "database bindings replaced");
        Ok(())
    }

    /// Adds one binding. Fails if the alias is taken.
    pub fn register_binding(&self, binding: Binding) -> Result<()> {
        self.inner.state.write().registry.register(binding)
    }

    /// Removes the binding of an alias.
    pub fn remove_binding(&self, alias: &str) -> Result<Binding> {
        self.inner.state.write().registry.remove(alias)
    }

    /// Replaces the schema document used for validation.
    pub fn set_schema_doc(&self, schema_doc: SchemaDoc) {
        self.inner.state.write().schema_doc = Arc::new(schema_doc);
    }

    // =========================================================================
    // Lookups (read lock)
    // =========================================================================

    /// Returns a copy of the binding of an alias.
    pub fn resolve_binding(&self, alias: &str) -> Result<Binding> {
        self.inner.state.read().registry.resolve(alias).cloned()
    }

    /// Returns the backend type of an alias (`sql-` prefix ignored).
    pub fn db_type(&self, alias: &str) -> Result<DbType> {
        self.inner.state.read().registry.db_type(alias)
    }

    /// Returns the registered aliases, sorted.
    pub fn aliases(&self) -> Vec<String> {
        self.inner
            .state
            .read()
            .registry
            .aliases()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn snapshot(&self, db_alias: &str) -> Snapshot {
        let state = self.inner.state.read();
        Snapshot {
            db_type: state.registry.db_type(db_alias),
            driver: state.registry.driver(db_alias),
            schema_doc: Arc::clone(&state.schema_doc),
        }
    }

    // =========================================================================
    // Internal Operations
    // =========================================================================

    /// Inserts one document (or several, for an array payload).
    ///
    /// Batched requests go through the worker channel of
    /// `(project, db_alias, collection)`. Returns the number of inserted
    /// documents. The metric is skipped when `ignore_metrics` is set.
    pub async fn internal_create(
        &self,
        db_alias: &str,
        project: &str,
        collection: &str,
        req: CreateRequest,
        ignore_metrics: bool,
    ) -> Result<i64> {
        let result = self
            .create_inner(db_alias, project, collection, req, ignore_metrics)
            .await;
        self.log_outcome(OperationKind::Create, db_alias, project, collection, &result);
        result
    }

    /// Updates the records matching the request's filter.
    pub async fn internal_update(
        &self,
        db_alias: &str,
        project: &str,
        collection: &str,
        req: UpdateRequest,
    ) -> Result<i64> {
        let result = self.update_inner(db_alias, collection, req).await;
        self.log_outcome(OperationKind::Update, db_alias, project, collection, &result);
        result
    }

    /// Deletes the records matching the request's filter.
    ///
    /// The metric is recorded with [`OperationKind::Update`], which is what
    /// downstream dashboards currently aggregate deletes under.
    pub async fn internal_delete(
        &self,
        db_alias: &str,
        project: &str,
        collection: &str,
        req: DeleteRequest,
    ) -> Result<i64> {
        let result = self.delete_inner(db_alias, collection, req).await;
        self.log_outcome(OperationKind::Delete, db_alias, project, collection, &result);
        result
    }

    async fn create_inner(
        &self,
        db_alias: &str,
        project: &str,
        collection: &str,
        req: CreateRequest,
        ignore_metrics: bool,
    ) -> Result<i64> {
        let snapshot = self.snapshot(db_alias);

        let db_type = snapshot.db_type?;
        self.inner.schema.validate_create_operation(
            db_alias,
            db_type,
            collection,
            &snapshot.schema_doc,
            &req,
        )?;

        let driver = snapshot.driver?;
        driver.is_client_safe().await?;

        let n = if req.is_batch {
            let key = TableKey::new(project, db_alias, collection);
            self.inner.batch.create_batch(&key, req.document).await?
        } else {
            driver.create(collection, &req).await?
        };

        if !ignore_metrics {
            self.record(db_alias, collection, n, OperationKind::Create);
        }
        Ok(n)
    }

    async fn update_inner(
        &self,
        db_alias: &str,
        collection: &str,
        mut req: UpdateRequest,
    ) -> Result<i64> {
        let snapshot = self.snapshot(db_alias);

        let db_type = snapshot.db_type?;
        self.inner.schema.validate_update_operation(
            db_alias,
            db_type,
            collection,
            &req.operation,
            &req.update,
            &req.find,
            &snapshot.schema_doc,
        )?;

        let driver = snapshot.driver?;
        driver.is_client_safe().await?;

        self.inner.schema.adjust_where_clause(
            db_alias,
            db_type,
            collection,
            &snapshot.schema_doc,
            &mut req.find,
        )?;

        let n = driver.update(collection, &req).await?;
        self.record(db_alias, collection, n, OperationKind::Update);
        Ok(n)
    }

    async fn delete_inner(
        &self,
        db_alias: &str,
        collection: &str,
        mut req: DeleteRequest,
    ) -> Result<i64> {
        let snapshot = self.snapshot(db_alias);

        let driver = snapshot.driver?;
        driver.is_client_safe().await?;

        let db_type = snapshot.db_type?;
        self.inner.schema.adjust_where_clause(
            db_alias,
            db_type,
            collection,
            &snapshot.schema_doc,
            &mut req.find,
        )?;

        let n = driver.delete(collection, &req).await?;
        self.record(db_alias, collection, n, OperationKind::Update);
        Ok(n)
    }

    fn record(&self, db_alias: &str, collection: &str, n: i64, kind: OperationKind) {
        self.inner
            .metrics
            .record(&self.inner.project, db_alias, collection, n, kind);
    }

    fn log_outcome(
        &self,
        op: OperationKind,
        db_alias: &str,
        project: &str,
        collection: &str,
        result: &Result<i64>,
    ) {
        match result {
            Ok(n) => debug!(
                project,
                db_alias,
                collection,
                op = %op,
                affected = n,
                "internal mutation succeeded"
            ),
            Err(err @ Error::ValidationFailed(_)) => debug!(
                project,
                db_alias,
                collection,
                op = %op,
                kind = %err.kind(),
                error = %err,
                "internal mutation rejected"
            ),
            Err(err) => warn!(
                project,
                db_alias,
                collection,
                op = %op,
                kind = %err.kind(),
                error = %err,
                "internal mutation failed"
            ),
        }
    }
}

impl std::fmt::Debug for CrudModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudModule")
            .field("project", &self.inner.project)
            .field("aliases", &self.aliases())
            .finish_non_exhaustive()
    }
}
