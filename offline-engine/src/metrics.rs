//! Prometheus metrics for reconciliation
//!
//! Double-spend attempts get a dedicated counter on top of the labelled
//! rejection counter: they are the fraud-response signal, not ordinary
//! validation noise.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Intents evaluated
    pub intents_total: IntCounter,

    /// Rejections by reason
    pub rejections_total: IntCounterVec,

    /// Double-spend attempts
    pub double_spends_total: IntCounter,

    /// Intents per reconcile call
    pub batch_size: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let intents_total = IntCounter::with_opts(Opts::new(
            "offline_intents_total",
            "Intents evaluated",
        ))?;
        registry.register(Box::new(intents_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("offline_rejections_total", "Rejections by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let double_spends_total = IntCounter::with_opts(Opts::new(
            "offline_double_spends_total",
            "Double-spend attempts",
        ))?;
        registry.register(Box::new(double_spends_total.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("offline_reconcile_batch_size", "Intents per reconcile call")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        Ok(Self {
            intents_total,
            rejections_total,
            double_spends_total,
            batch_size,
            registry,
        })
    }

    /// Record one evaluated intent
    pub fn record_intent(&self) {
        self.intents_total.inc();
    }

    /// Record a rejection
    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    /// Record a double-spend attempt
    pub fn record_double_spend(&self) {
        self.double_spends_total.inc();
    }

    /// Record a reconcile call
    pub fn record_batch(&self, intents: usize) {
        self.batch_size.observe(intents as f64);
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
        assert_eq!(metrics.intents_total.get(), 0);
        assert_eq!(metrics.double_spends_total.get(), 0);
    }

    #[test]
    fn test_record_rejection_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("double_spend");
        metrics.record_rejection("double_spend");
        metrics.record_rejection("ttl_expired");

        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["double_spend"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["ttl_expired"])
                .get(),
            1
        );
    }
}
