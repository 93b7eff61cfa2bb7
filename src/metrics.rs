//! Throughput and outcome statistics for the scoring service.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for the scoring loop
pub struct PipelineMetrics {
    /// Records scored successfully
    pub records_scored: AtomicU64,
    /// Records predicted to churn
    pub churn_predicted: AtomicU64,
    /// Records rejected as client errors
    pub records_rejected: AtomicU64,
    /// Rejections keyed by offending field
    rejected_by_field: RwLock<BTreeMap<String, u64>>,
    /// Scored records by risk level
    by_risk_level: RwLock<BTreeMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Churn probability histogram, ten buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            records_scored: AtomicU64::new(0),
            churn_predicted: AtomicU64::new(0),
            records_rejected: AtomicU64::new(0),
            rejected_by_field: RwLock::new(BTreeMap::new()),
            by_risk_level: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored customer
    pub fn record_score(&self, processing_time: Duration, probability: f64, label: u8, risk_level: &str) {
        self.records_scored.fetch_add(1, Ordering::Relaxed);
        if label == 1 {
            self.churn_predicted.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut levels) = self.by_risk_level.write() {
            *levels.entry(risk_level.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a rejected record; `field` is `None` for undecodable payloads
    pub fn record_rejection(&self, field: Option<&str>) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_field) = self.rejected_by_field.write() {
            *by_field
                .entry(field.unwrap_or("<payload>").to_string())
                .or_insert(0) += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self
            .processing_times
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Records scored per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        *self
            .probability_buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_rejections_by_field(&self) -> BTreeMap<String, u64> {
        self.rejected_by_field
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_risk_levels(&self) -> BTreeMap<String, u64> {
        self.by_risk_level
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scored = self.records_scored.load(Ordering::Relaxed);
        let churners = self.churn_predicted.load(Ordering::Relaxed);
        let rejected = self.records_rejected.load(Ordering::Relaxed);
        let churn_rate = if scored > 0 {
            (churners as f64 / scored as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let levels = self.get_risk_levels();
        let rejections = self.get_rejections_by_field();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            CHURN SCORING PIPELINE - METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Records Scored:   {:>8}  │  Throughput: {:>8.1} rec/s      ║",
            scored, throughput
        );
        info!(
            "║ Predicted Churn:  {:>8}  │  Churn Rate: {:>6.1}%            ║",
            churners, churn_rate
        );
        info!("║ Rejected:         {:>8}                                   ║", rejected);
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Scored by Risk Level:                                        ║");
        for (level, count) in &levels {
            let pct = if scored > 0 {
                (*count as f64 / scored as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)                                ║", level, count, pct);
        }
        if !rejections.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Rejections by Field:                                         ║");
            for (field, count) in &rejections {
                info!("║   {:14}: {:>6}                                     ║", field, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Churn Probability Distribution:                              ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
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
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Run until the task is dropped
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_score(Duration::from_micros(100), 0.2, 0, "low");
        metrics.record_score(Duration::from_micros(300), 0.95, 1, "critical");
        metrics.record_score(Duration::from_micros(200), 1.0, 1, "critical");

        assert_eq!(metrics.records_scored.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.churn_predicted.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.get_risk_levels().get("critical"), Some(&2));

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[2], 1);
        assert_eq!(distribution[9], 2);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean_us, 200);
        assert_eq!(stats.p50_us, 200);
        assert_eq!(stats.max_us, 300);
    }

    #[test]
    fn test_rejections_by_field() {
        let metrics = PipelineMetrics::new();
        metrics.record_rejection(Some("Country"));
        metrics.record_rejection(Some("Country"));
        metrics.record_rejection(None);

        assert_eq!(metrics.records_rejected.load(Ordering::Relaxed), 3);
        let by_field = metrics.get_rejections_by_field();
        assert_eq!(by_field.get("Country"), Some(&2));
        assert_eq!(by_field.get("<payload>"), Some(&1));
    }

    #[test]
    fn test_empty_stats() {
        let metrics = PipelineMetrics::new();
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.p99_us, 0);
        metrics.print_summary();
    }
}
