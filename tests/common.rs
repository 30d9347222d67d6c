#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crudgate::{
    BatchReceiver, Binding, CreateRequest, Crud, CrudModule, DatabaseConfig, DbType,
    DeleteRequest, Error, Filter, MetricSink, ModuleConfig, OperationKind, Result, SchemaDoc,
    SchemaValidator, UpdateRequest,
};

pub const PROJECT: &str = "projA";
pub const ALIAS: &str = "main";
pub const USERS: &str = "users";

// =============================================================================
// Spy Driver
// =============================================================================

/// Driver that records every call and can be told to fail or stall.
#[derive(Default)]
pub struct SpyDriver {
    pub calls: Mutex<Vec<String>>,
    pub filters: Mutex<Vec<Filter>>,
    unsafe_reason: Option<String>,
    exec_error: Option<String>,
    affected: i64,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl SpyDriver {
    pub fn new() -> Self {
        Self {
            affected: 1,
            ..Self::default()
        }
    }

    pub fn unsafe_client(reason: &str) -> Self {
        Self {
            unsafe_reason: Some(reason.to_string()),
            ..Self::new()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            exec_error: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn with_affected(affected: i64) -> Self {
        Self {
            affected,
            ..Self::new()
        }
    }

    /// Update and delete notify `entered`, then wait on `release`.
    pub fn gated(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((entered, release)),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn mutation_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != "is_client_safe")
            .collect()
    }

    fn log(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn outcome(&self, n: i64) -> Result<i64> {
        match &self.exec_error {
            Some(message) => Err(Error::ExecutionFailed(message.clone())),
            None => Ok(n),
        }
    }

    async fn pass_gate(&self) {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
    }
}

#[async_trait]
impl Crud for SpyDriver {
    async fn create(&self, collection: &str, req: &CreateRequest) -> Result<i64> {
        self.log(format!("create:{}", collection));
        let n = match &req.document {
            Value::Array(items) => items.len() as i64,
            _ => 1,
        };
        self.outcome(n)
    }

    async fn update(&self, collection: &str, req: &UpdateRequest) -> Result<i64> {
        self.log(format!("update:{}", collection));
        self.filters.lock().push(req.find.clone());
        self.pass_gate().await;
        self.outcome(self.affected)
    }

    async fn delete(&self, collection: &str, req: &DeleteRequest) -> Result<i64> {
        self.log(format!("delete:{}", collection));
        self.filters.lock().push(req.find.clone());
        self.pass_gate().await;
        self.outcome(self.affected)
    }

    async fn is_client_safe(&self) -> Result<()> {
        self.log("is_client_safe".to_string());
        match &self.unsafe_reason {
            Some(reason) => Err(Error::UnsafeClient(reason.clone())),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Spy Schema
// =============================================================================

/// Arguments one schema call received.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaCall {
    pub call: &'static str,
    pub db_alias: String,
    pub db_type: DbType,
    pub collection: String,
    pub schema: SchemaDoc,
}

/// Schema collaborator that records calls and tags adjusted filters.
#[derive(Default)]
pub struct SpySchema {
    pub calls: Mutex<Vec<&'static str>>,
    pub seen: Mutex<Vec<SchemaCall>>,
    reject_create: Option<String>,
    reject_update: Option<String>,
    reject_adjust: Option<String>,
}

impl SpySchema {
    pub fn rejecting_create(reason: &str) -> Self {
        Self {
            reject_create: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn rejecting_update(reason: &str) -> Self {
        Self {
            reject_update: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn rejecting_adjust(reason: &str) -> Self {
        Self {
            reject_adjust: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn seen(&self) -> Vec<SchemaCall> {
        self.seen.lock().clone()
    }

    fn log(
        &self,
        call: &'static str,
        db_alias: &str,
        db_type: DbType,
        collection: &str,
        schema: &SchemaDoc,
    ) {
        self.calls.lock().push(call);
        self.seen.lock().push(SchemaCall {
            call,
            db_alias: db_alias.to_string(),
            db_type,
            collection: collection.to_string(),
            schema: schema.clone(),
        });
    }
}

fn verdict(reason: &Option<String>) -> Result<()> {
    match reason {
        Some(reason) => Err(Error::ValidationFailed(reason.clone())),
        None => Ok(()),
    }
}

impl SchemaValidator for SpySchema {
    fn validate_create_operation(
        &self,
        db_alias: &str,
        db_type: DbType,
        collection: &str,
        schema: &SchemaDoc,
        _req: &CreateRequest,
    ) -> Result<()> {
        self.log("validate_create", db_alias, db_type, collection, schema);
        verdict(&self.reject_create)
    }

    fn validate_update_operation(
        &self,
        db_alias: &str,
        db_type: DbType,
        collection: &str,
        _operation: &str,
        _update: &Map<String, Value>,
        _find: &Filter,
        schema: &SchemaDoc,
    ) -> Result<()> {
        self.log("validate_update", db_alias, db_type, collection, schema);
        verdict(&self.reject_update)
    }

    fn adjust_where_clause(
        &self,
        db_alias: &str,
        db_type: DbType,
        collection: &str,
        schema: &SchemaDoc,
        find: &mut Filter,
    ) -> Result<()> {
        self.log("adjust_where_clause", db_alias, db_type, collection, schema);
        verdict(&self.reject_adjust)?;
        find.insert("_adjusted_for".to_string(), Value::from(db_type.as_str()));
        Ok(())
    }
}

// =============================================================================
// Spy Metrics
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub project: String,
    pub db_alias: String,
    pub collection: String,
    pub count: i64,
    pub kind: OperationKind,
}

#[derive(Default)]
pub struct SpyMetrics {
    pub records: Mutex<Vec<MetricRecord>>,
}

impl SpyMetrics {
    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().clone()
    }
}

impl MetricSink for SpyMetrics {
    fn record(&self, project: &str, db_alias: &str, collection: &str, count: i64, kind: OperationKind) {
        self.records.lock().push(MetricRecord {
            project: project.to_string(),
            db_alias: db_alias.to_string(),
            collection: collection.to_string(),
            count,
            kind,
        });
    }
}

// =============================================================================
// Module Fixtures
// =============================================================================

pub struct Fixture {
    pub module: CrudModule,
    pub driver: Arc<SpyDriver>,
    pub schema: Arc<SpySchema>,
    pub metrics: Arc<SpyMetrics>,
}

/// Module for `PROJECT` with one Postgres binding aliased `ALIAS`.
pub fn fixture(driver: SpyDriver, schema: SpySchema) -> Fixture {
    fixture_with_config(driver, schema, ModuleConfig::default())
}

pub fn fixture_with_config(driver: SpyDriver, schema: SpySchema, config: ModuleConfig) -> Fixture {
    let driver = Arc::new(driver);
    let schema = Arc::new(schema);
    let metrics = Arc::new(SpyMetrics::default());

    let module = CrudModule::new(PROJECT, schema.clone(), metrics.clone(), config);
    module
        .set_bindings(vec![Binding::new(
            DatabaseConfig::new(ALIAS, DbType::Postgres, "postgres://localhost/app"),
            driver.clone(),
        )])
        .expect("register binding");

    Fixture {
        module,
        driver,
        schema,
        metrics,
    }
}

pub fn filter(pairs: &[(&str, Value)]) -> Filter {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// =============================================================================
// Batch Workers
// =============================================================================

/// Worker that answers every request with `Ok(())` and returns the total
/// number of documents it saw once the channel closes.
pub fn spawn_succeeding_worker(mut rx: BatchReceiver) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut documents = 0;
        while let Some(request) = rx.recv().await {
            documents += request.len();
            request.respond(Ok(()));
        }
        documents
    })
}

/// Worker that answers every request with an execution error.
pub fn spawn_failing_worker(mut rx: BatchReceiver, message: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            request.respond(Err(Error::ExecutionFailed(message.to_string())));
        }
    })
}

/// Worker that groups requests arriving within `window` (up to
/// `max_requests`) into one write, recording the document count per write.
pub fn spawn_aggregating_worker(
    mut rx: BatchReceiver,
    window: Duration,
    max_requests: usize,
) -> (JoinHandle<()>, Arc<Mutex<Vec<usize>>>) {
    let writes = Arc::new(Mutex::new(Vec::new()));
    let worker_writes = Arc::clone(&writes);

    let handle = tokio::spawn(async move {
        while let Some(first) = rx.recv().await {
            let deadline = Instant::now() + window;
            let mut pending = vec![first];

            while pending.len() < max_requests {
                match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(Some(request)) => pending.push(request),
                    Ok(None) | Err(_) => break,
                }
            }

            let documents: usize = pending.iter().map(|r| r.len()).sum();
            worker_writes.lock().push(documents);

            for request in pending {
                request.respond(Ok(()));
            }
        }
    });

    (handle, writes)
}
