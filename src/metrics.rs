//! Runtime statistics for the scoring service.

use crate::models::consensus::agreement;
use crate::types::prediction::PredictionResult;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

const LATENCY_WINDOW: usize = 10_000;
const AGREEMENT_WINDOW: usize = 1_000;
const SCORE_BUCKETS: usize = 10;

/// Rolling window of the most recent samples
#[derive(Debug)]
struct Window<T> {
    samples: Vec<T>,
    capacity: usize,
}

impl<T: Copy> Window<T> {
    fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, sample: T) {
        if self.samples.len() == self.capacity {
            // drop the older half in one go
            self.samples.drain(0..self.capacity / 2);
        }
        self.samples.push(sample);
    }
}

/// Counters and rolling windows shared by all scoring tasks
pub struct ScoringMetrics {
    pub transactions_scored: AtomicU64,
    pub transactions_rejected: AtomicU64,
    pub lr_frauds: AtomicU64,
    pub rf_frauds: AtomicU64,
    pub consensus_frauds: AtomicU64,
    rejections_by_code: Mutex<BTreeMap<String, u64>>,
    latencies_us: Mutex<Window<u64>>,
    agreements: Mutex<Window<f64>>,
    score_histogram: Mutex<[u64; SCORE_BUCKETS]>,
    started: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            transactions_rejected: AtomicU64::new(0),
            lr_frauds: AtomicU64::new(0),
            rf_frauds: AtomicU64::new(0),
            consensus_frauds: AtomicU64::new(0),
            rejections_by_code: Mutex::new(BTreeMap::new()),
            latencies_us: Mutex::new(Window::new(LATENCY_WINDOW)),
            agreements: Mutex::new(Window::new(AGREEMENT_WINDOW)),
            score_histogram: Mutex::new([0; SCORE_BUCKETS]),
            started: Instant::now(),
        }
    }

    /// Record a scored transaction
    pub fn record_prediction(&self, elapsed: Duration, result: &PredictionResult) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        for (label, counter) in [
            (result.lr_prediction, &self.lr_frauds),
            (result.rf_prediction, &self.rf_frauds),
            (result.consensus_prediction, &self.consensus_frauds),
        ] {
            if label == 1 {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut latencies) = self.latencies_us.lock() {
            latencies.push(elapsed.as_micros() as u64);
        }
        if let Ok(mut agreements) = self.agreements.lock() {
            agreements.push(agreement(result.lr_probability, result.rf_probability));
        }
        if let Ok(mut histogram) = self.score_histogram.lock() {
            histogram[score_bucket(result.consensus_score)] += 1;
        }
    }

    /// Record a rejected request under its error code
    pub fn record_rejection(&self, code: &str) {
        self.transactions_rejected.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_code) = self.rejections_by_code.lock() {
            *by_code.entry(code.to_string()).or_default() += 1;
        }
    }

    /// Scored transactions per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Consistent copy of everything recorded so far
    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency = self
            .latencies_us
            .lock()
            .map(|w| LatencyStats::from_samples(&w.samples))
            .unwrap_or_default();
        let avg_agreement = self
            .agreements
            .lock()
            .map(|w| mean(&w.samples))
            .unwrap_or_default();

        MetricsSnapshot {
            scored: self.transactions_scored.load(Ordering::Relaxed),
            rejected: self.transactions_rejected.load(Ordering::Relaxed),
            lr_frauds: self.lr_frauds.load(Ordering::Relaxed),
            rf_frauds: self.rf_frauds.load(Ordering::Relaxed),
            consensus_frauds: self.consensus_frauds.load(Ordering::Relaxed),
            throughput: self.throughput(),
            latency,
            avg_agreement,
            score_histogram: self.score_histogram.lock().map(|h| *h).unwrap_or_default(),
            rejections_by_code: self
                .rejections_by_code
                .lock()
                .map(|r| r.clone())
                .unwrap_or_default(),
        }
    }

    /// Log a summary block
    pub fn print_summary(&self) {
        self.snapshot().log();
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn score_bucket(score: f64) -> usize {
    ((score * SCORE_BUCKETS as f64) as usize).min(SCORE_BUCKETS - 1)
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

/// Latency percentiles in microseconds
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl LatencyStats {
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let nearest_rank = |q: f64| sorted[((sorted.len() - 1) as f64 * q).round() as usize];
        Self {
            count: sorted.len() as u64,
            mean_us: sorted.iter().sum::<u64>() / sorted.len() as u64,
            p50_us: nearest_rank(0.50),
            p95_us: nearest_rank(0.95),
            p99_us: nearest_rank(0.99),
            max_us: sorted[sorted.len() - 1],
        }
    }
}

/// Point-in-time view of [`ScoringMetrics`]
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub scored: u64,
    pub rejected: u64,
    pub lr_frauds: u64,
    pub rf_frauds: u64,
    pub consensus_frauds: u64,
    pub throughput: f64,
    pub latency: LatencyStats,
    pub avg_agreement: f64,
    pub score_histogram: [u64; SCORE_BUCKETS],
    pub rejections_by_code: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Share of scored transactions, in percent
    pub fn percent_of_scored(&self, count: u64) -> f64 {
        if self.scored == 0 {
            0.0
        } else {
            count as f64 / self.scored as f64 * 100.0
        }
    }

    pub fn log(&self) {
        info!("╔══════════════════════ SCORING SUMMARY ══════════════════════╗");
        info!(
            "║ scored {:>8}   rejected {:>8}   {:>8.1} tx/s",
            self.scored, self.rejected, self.throughput
        );
        info!(
            "║ fraud  LR {:>6} ({:>5.1}%)  RF {:>6} ({:>5.1}%)  consensus {:>6} ({:>5.1}%)",
            self.lr_frauds,
            self.percent_of_scored(self.lr_frauds),
            self.rf_frauds,
            self.percent_of_scored(self.rf_frauds),
            self.consensus_frauds,
            self.percent_of_scored(self.consensus_frauds)
        );
        info!(
            "║ latency us  mean {}  p50 {}  p95 {}  p99 {}  max {}",
            self.latency.mean_us,
            self.latency.p50_us,
            self.latency.p95_us,
            self.latency.p99_us,
            self.latency.max_us
        );
        info!("║ LR/RF agreement {:.1}%", self.avg_agreement * 100.0);
        for (code, count) in &self.rejections_by_code {
            info!("║ rejected [{}] {}", code, count);
        }

        let total: u64 = self.score_histogram.iter().sum();
        for (i, &count) in self.score_histogram.iter().enumerate() {
            let share = if total > 0 { count as f64 / total as f64 } else { 0.0 };
            info!(
                "║ score {:.1}-{:.1} {:>6} {}",
                i as f64 / SCORE_BUCKETS as f64,
                (i + 1) as f64 / SCORE_BUCKETS as f64,
                count,
                "█".repeat((share * 40.0) as usize)
            );
        }
        info!("╚═════════════════════════════════════════════════════════════╝");
    }
}

/// Prints a summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<ScoringMetrics>,
    every: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScoringMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            every: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run until the runtime shuts down
    pub async fn start(self) {
        let mut ticker = tokio::time::interval(self.every);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.metrics.print_summary();
        }
    }
}
