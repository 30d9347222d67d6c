//! Metric sink contract.
//!
//! The pipeline reports one record per successful mutation. Recording is
//! fire-and-forget: a sink cannot fail the operation that triggered it.

use std::sync::Arc;

use crate::types::OperationKind;

/// Receives one record per successful mutation.
pub trait MetricSink: Send + Sync {
    fn record(&self, project: &str, db_alias: &str, collection: &str, count: i64, kind: OperationKind);
}

impl<F> MetricSink for F
where
    F: Fn(&str, &str, &str, i64, OperationKind) + Send + Sync,
{
    fn record(&self, project: &str, db_alias: &str, collection: &str, count: i64, kind: OperationKind) {
        self(project, db_alias, collection, count, kind)
    }
}

/// Shared handle to a metric sink.
pub type MetricHook = Arc<dyn MetricSink>;

/// Sink that drops every record.
pub fn noop_metric_hook() -> MetricHook {
    Arc::new(|_: &str, _: &str, _: &str, _: i64, _: OperationKind| {})
}
