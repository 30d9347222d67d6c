//! Driver capability contract.
//!
//! One implementation exists per backend (SQL, document store, ...). The
//! pipeline only ever talks to `dyn Crud`, so it stays ignorant of query
//! translation and connection handling.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CreateRequest, DeleteRequest, UpdateRequest};

/// Mutations a backend driver must support.
///
/// Every mutation returns the number of affected records. Drivers report
/// failures as [`Error::ExecutionFailed`](crate::Error::ExecutionFailed) and
/// readiness problems as [`Error::UnsafeClient`](crate::Error::UnsafeClient).
#[async_trait]
pub trait Crud: Send + Sync {
    async fn create(&self, collection: &str, req: &CreateRequest) -> Result<i64>;

    async fn update(&self, collection: &str, req: &UpdateRequest) -> Result<i64>;

    async fn delete(&self, collection: &str, req: &DeleteRequest) -> Result<i64>;

    /// Readiness check performed before every mutation.
    async fn is_client_safe(&self) -> Result<()>;
}

/// Shared handle to a driver.
pub type DriverHandle = Arc<dyn Crud>;
