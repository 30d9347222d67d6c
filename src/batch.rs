//! # Batch Coordinator (Producer Side)
//!
//! Batched creates let many concurrent inserts into the same table share a
//! single backend write. Each batched table has one worker that owns the
//! receiving end of a channel; producers talk to it only by message passing.
//!
//! ```text
//!   create_batch ─┐                        ┌──────────────────────────┐
//!   create_batch ─┼─ mpsc (per table) ───► │  worker (external)       │
//!   create_batch ─┘                        │  aggregate → driver write│
//!        ▲                                 └────────────┬─────────────┘
//!        │           oneshot (per request)              │
//!        └──────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! 1. The producer normalizes the payload into a list of documents. An empty
//!    list short-circuits with a count of zero; nothing is sent.
//! 2. The producer looks up the channel for `(project, alias, collection)`.
//!    Channels are provisioned elsewhere and attached with
//!    [`BatchCoordinator::attach`]. A missing channel is
//!    [`Error::ChannelNotConfigured`], returned without blocking.
//! 3. The producer creates a single-slot response channel, sends a
//!    [`BatchRequest`] and waits for exactly one [`BatchResponse`].
//! 4. The producer closes its response channel on every exit path, then
//!    returns the worker's verdict.
//!
//! The worker answers through [`BatchRequest::respond`], which consumes the
//! request, so a request can be answered at most once.
//!
//! ## Backpressure and Cancellation
//!
//! Sending onto a full table channel waits for capacity. When the coordinator
//! has a response timeout, it bounds the whole handoff (send and receive) and
//! expiry yields [`Error::BatchTimeout`]. Dropping the producer future has the
//! same effect on the channel: the worker's late reply is rejected.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::types::{Document, TableKey};

/// Sending half of a table's batch channel.
pub type BatchSender = mpsc::Sender<BatchRequest>;

/// Receiving half of a table's batch channel, owned by its worker.
pub type BatchReceiver = mpsc::Receiver<BatchRequest>;

// =============================================================================
// Messages
// =============================================================================

/// Result of one batched insert, as reported by the worker.
#[derive(Debug)]
pub struct BatchResponse {
    pub result: Result<()>,
}

/// Documents to insert plus the channel to answer on.
#[derive(Debug)]
pub struct BatchRequest {
    documents: Vec<Document>,
    response: oneshot::Sender<BatchResponse>,
}

impl BatchRequest {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Takes the documents out, leaving the request ready to be answered.
    pub fn take_documents(&mut self) -> Vec<Document> {
        std::mem::take(&mut self.documents)
    }

    /// True once the producer has stopped waiting.
    pub fn is_abandoned(&self) -> bool {
        self.response.is_closed()
    }

    /// Answers the producer. Returns false if the producer already gave up.
    pub fn respond(self, result: Result<()>) -> bool {
        self.response.send(BatchResponse { result }).is_ok()
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Routes batched creates to the worker channel of their table.
#[derive(Debug, Default)]
pub struct BatchCoordinator {
    channels: RwLock<HashMap<TableKey, BatchSender>>,
    response_timeout: Option<Duration>,
}

impl BatchCoordinator {
    pub fn new(response_timeout: Option<Duration>) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            response_timeout,
        }
    }

    /// Attaches the channel of a provisioned worker, returning any previous
    /// sender for the same table.
    pub fn attach(&self, key: TableKey, sender: BatchSender) -> Option<BatchSender> {
        self.channels.write().insert(key, sender)
    }

    /// Detaches the channel of a table.
    pub fn detach(&self, key: &TableKey) -> Option<BatchSender> {
        self.channels.write().remove(key)
    }

    pub fn is_configured(&self, key: &TableKey) -> bool {
        self.channels.read().contains_key(key)
    }

    /// Inserts `doc` through the batch worker of `key`'s table.
    ///
    /// Returns the number of documents handed to the worker once it reports
    /// success.
    pub async fn create_batch(&self, key: &TableKey, doc: Value) -> Result<i64> {
        let documents = documents_from(doc)?;
        let count = documents.len() as i64;

        if count == 0 {
            return Ok(0);
        }

        let sender = self
            .channels
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ChannelNotConfigured {
                project: key.project.clone(),
                db_alias: key.db_alias.clone(),
                collection: key.collection.clone(),
            })?;

        let (response_tx, mut response_rx) = oneshot::channel();
        let request = BatchRequest {
            documents,
            response: response_tx,
        };

        let outcome = self
            .handoff(&sender, request, &mut response_rx, &key.collection)
            .await;
        response_rx.close();

        outcome.map(|()| count)
    }

    async fn handoff(
        &self,
        sender: &BatchSender,
        request: BatchRequest,
        response_rx: &mut oneshot::Receiver<BatchResponse>,
        collection: &str,
    ) -> Result<()> {
        let gone = || Error::BatchWorkerGone {
            collection: collection.to_string(),
        };

        let exchange = async {
            sender.send(request).await.map_err(|_| gone())?;
            let response = response_rx.await.map_err(|_| gone())?;
            response.result
        };

        match self.response_timeout {
            None => exchange.await,
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(result) => result,
                Err(_) => Err(Error::BatchTimeout {
                    collection: collection.to_string(),
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }),
            },
        }
    }
}

// =============================================================================
// Document Normalization
// =============================================================================

/// Normalizes a create payload into a list of documents.
fn documents_from(doc: Value) -> Result<Vec<Document>> {
    match doc {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(Error::UnsupportedDocumentType {
                    found: json_type_name(&other),
                }),
            })
            .collect(),
        other => Err(Error::UnsupportedDocumentType {
            found: json_type_name(&other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Tests
// =============================================================================
