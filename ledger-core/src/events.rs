//! Ledger event stream for the analytics collaborator
//!
//! Fire-and-forget: the engines publish and move on; no delivery guarantee
//! is made and a missing consumer is not an error.

use crate::types::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Summary of a settled offline batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Entries submitted to the ledger
    pub batch_size: usize,
    /// Entries committed
    pub success_count: usize,
    /// Completion time
    pub timestamp: DateTime<Utc>,
}

/// Event published on ledger mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A transfer committed; carries the full record
    Transfer(Transaction),
    /// An offline batch settled
    BatchReconcile(BatchSummary),
}

/// Fire-and-forget event sink
pub trait EventSink: Send + Sync {
    /// Publish one event; must not block or fail the caller
    fn publish(&self, event: LedgerEvent);
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: LedgerEvent) {}
}

/// Broadcast-channel sink; consumers subscribe, slow consumers lag and lose
#[derive(Debug)]
pub struct BroadcastSink {
    tx: broadcast::Sender<LedgerEvent>,
}

impl BroadcastSink {
    /// Create a sink with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe a consumer
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: LedgerEvent) {
        // send fails only when nobody is subscribed
        let _ = self.tx.send(event);
    }
}
