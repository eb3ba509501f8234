//! Prometheus metrics for the ledger engine
//!
//! Built against an owned registry so every engine instance (and every
//! test) gets an independent namespace.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed transactions by kind
    pub transactions_total: IntCounterVec,

    /// Store conflicts surfaced to callers
    pub conflicts_total: IntCounter,

    /// Entries per reconcile batch
    pub batch_entries: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_total = IntCounterVec::new(
            Opts::new("ledger_transactions_total", "Committed transactions by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let conflicts_total = IntCounter::with_opts(Opts::new(
            "ledger_store_conflicts_total",
            "Store conflicts surfaced to callers",
        ))?;
        registry.register(Box::new(conflicts_total.clone()))?;

        let batch_entries = Histogram::with_opts(
            HistogramOpts::new("ledger_batch_entries", "Entries per reconcile batch")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        )?;
        registry.register(Box::new(batch_entries.clone()))?;

        Ok(Self {
            transactions_total,
            conflicts_total,
            batch_entries,
            registry,
        })
    }

    /// Record a committed transaction
    pub fn record_transaction(&self, kind: &str) {
        self.transactions_total.with_label_values(&[kind]).inc();
    }

    /// Record a store conflict
    pub fn record_conflict(&self) {
        self.conflicts_total.inc();
    }

    /// Record a reconcile batch submission
    pub fn record_batch(&self, entries: usize) {
        self.batch_entries.observe(entries as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.conflicts_total.get(), 0);
    }

    #[test]
    fn test_record_transaction() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transaction("transfer");
        metrics.record_transaction("transfer");
        metrics.record_transaction("mint");

        assert_eq!(
            metrics
                .transactions_total
                .with_label_values(&["transfer"])
                .get(),
            2
        );
        assert_eq!(
            metrics.transactions_total.with_label_values(&["mint"]).get(),
            1
        );
    }

    #[test]
    fn test_independent_instances() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_conflict();
        assert_eq!(a.conflicts_total.get(), 1);
        assert_eq!(b.conflicts_total.get(), 0);
    }
}
