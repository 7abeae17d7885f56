//! Custodia audit - sinks and async dispatch
//!
//! Audit delivery is decoupled from policy evaluation through a bounded
//! queue: the evaluator hands events to an [`AuditDispatcher`] without
//! awaiting, and a background worker drains the queue into the configured
//! [`AuditSink`]. A full queue drops the event with a warning rather than
//! applying backpressure to the decision path.

#![deny(unsafe_code)]

use async_trait::async_trait;
use custodia_types::PolicyAuditEvent;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

/// Errors from audit sinks
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink rejected or failed to persist the event
    #[error("audit sink failure: {reason}")]
    Sink { reason: String },
}

/// Destination for policy audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist or forward one event
    async fn log(&self, event: PolicyAuditEvent) -> Result<(), AuditError>;
}

/// Sink that records events in memory, mainly for tests and inspection
#[derive(Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<PolicyAuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty memory sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event
    pub fn events(&self) -> Vec<PolicyAuditEvent> {
        self.events.read().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether no events were recorded
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn log(&self, event: PolicyAuditEvent) -> Result<(), AuditError> {
        self.events.write().push(event);
        Ok(())
    }
}

/// Sink that emits events as structured log records
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log(&self, event: PolicyAuditEvent) -> Result<(), AuditError> {
        info!(
            target: "custodia::audit",
            event_id = %event.id,
            kind = ?event.kind,
            correlation_id = %event.correlation_id,
            workspace_id = %event.workspace_id,
            user_id = %event.user_id,
            operation = %event.operation,
            allow = event.allow,
            violations = event.violations.len(),
            "Policy audit event"
        );
        Ok(())
    }
}

/// Non-blocking front end over a spawned sink worker.
///
/// Cloning shares the queue; the worker exits when every dispatcher clone
/// is dropped.
#[derive(Clone)]
pub struct AuditDispatcher {
    tx: mpsc::Sender<PolicyAuditEvent>,
}

impl AuditDispatcher {
    /// Spawn the drain worker for a sink. Must be called inside a tokio
    /// runtime.
    pub fn spawn(sink: Arc<dyn AuditSink>, queue_depth: usize) -> Self {
        let (tx, mut rx) = mpsc::channel(queue_depth.max(1));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = sink.log(event).await {
                    warn!(error = %err, "Audit sink rejected event");
                }
            }
        });
        Self { tx }
    }

    /// Enqueue one event without blocking. A full or closed queue drops the
    /// event; the decision that produced it is unaffected.
    pub fn emit(&self, event: PolicyAuditEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(event_id = %event.id, "Audit queue full; dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(event_id = %event.id, "Audit worker gone; dropping event");
            }
        }
    }
}
