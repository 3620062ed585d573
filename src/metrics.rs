//! Evaluation metrics for the review pipeline.

use crate::pipeline::{Evaluation, LedgerOutcome, NotificationOutcome};
use crate::types::ModelLabel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline activity
pub struct PipelineMetrics {
    /// Evaluations that produced a verdict
    pub evaluations: AtomicU64,
    /// Evaluations rejected for invalid input or classifier failure
    pub rejected: AtomicU64,
    /// Verdicts where the model said fraudulent
    pub model_fraud: AtomicU64,
    /// Verdicts flagged for review
    pub flagged: AtomicU64,
    pub ledger_failures: AtomicU64,
    pub notifications_delivered: AtomicU64,
    pub notifications_failed: AtomicU64,
    /// Hits per rule id
    rule_hits: RwLock<HashMap<&'static str, u64>>,
    /// Evaluation times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            evaluations: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            model_fraud: AtomicU64::new(0),
            flagged: AtomicU64::new(0),
            ledger_failures: AtomicU64::new(0),
            notifications_delivered: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            rule_hits: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a completed evaluation
    pub fn record_evaluation(&self, evaluation: &Evaluation, processing_time: Duration) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        if evaluation.verdict.model_label == ModelLabel::Fraudulent {
            self.model_fraud.fetch_add(1, Ordering::Relaxed);
        }
        if evaluation.verdict.is_flagged() {
            self.flagged.fetch_add(1, Ordering::Relaxed);
        }
        if let LedgerOutcome::Failed(_) = evaluation.ledger {
            self.ledger_failures.fetch_add(1, Ordering::Relaxed);
        }
        match evaluation.notification {
            NotificationOutcome::Delivered => {
                self.notifications_delivered.fetch_add(1, Ordering::Relaxed);
            }
            NotificationOutcome::Failed(_) => {
                self.notifications_failed.fetch_add(1, Ordering::Relaxed);
            }
            NotificationOutcome::NotRequired => {}
        }

        if let Ok(mut hits) = self.rule_hits.write() {
            for finding in &evaluation.verdict.findings {
                *hits.entry(finding.rule_id).or_insert(0) += 1;
            }
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Hits per rule id
    pub fn get_rule_hits(&self) -> HashMap<&'static str, u64> {
        self.rule_hits
            .read()
            .map(|hits| hits.clone())
            .unwrap_or_default()
    }

    /// Evaluations per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.evaluations.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let evaluations = self.evaluations.load(Ordering::Relaxed);
        let flagged = self.flagged.load(Ordering::Relaxed);
        let flag_rate = if evaluations > 0 {
            (flagged as f64 / evaluations as f64) * 100.0
        } else {
            0.0
        };
        let processing = self.get_processing_stats();

        info!(
            evaluations = evaluations,
            rejected = self.rejected.load(Ordering::Relaxed),
            model_fraud = self.model_fraud.load(Ordering::Relaxed),
            flagged = flagged,
            flag_rate = format!("{:.1}%", flag_rate),
            throughput = format!("{:.2} tx/s", self.get_throughput()),
            "Review pipeline summary"
        );
        info!(
            ledger_failures = self.ledger_failures.load(Ordering::Relaxed),
            notifications_delivered = self.notifications_delivered.load(Ordering::Relaxed),
            notifications_failed = self.notifications_failed.load(Ordering::Relaxed),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Side effects and latency"
        );

        let mut hits: Vec<_> = self.get_rule_hits().into_iter().collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        for (rule_id, count) in hits {
            info!(rule = rule_id, hits = count, "Rule hits");
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
