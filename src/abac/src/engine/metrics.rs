//! Ability engine metrics

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Engine counters and build latency summary
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Total `get_ability` calls
    pub ability_requests: u64,

    /// Requests answered from the cache
    pub cache_hits: u64,

    /// Requests that required a build
    pub cache_misses: u64,

    /// Abilities compiled successfully
    pub abilities_built: u64,

    /// Builds that failed (unknown user, store unavailable)
    pub build_failures: u64,

    /// Permission records dropped while compiling
    pub records_skipped: u64,

    /// Build latency percentiles
    pub build_latency_p50_ms: f64,
    pub build_latency_p90_ms: f64,
    pub build_latency_p99_ms: f64,

    /// Average build latency
    pub avg_build_latency_ms: f64,
}

impl EngineMetrics {
    /// Calculate cache hit rate
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// Metrics collector
pub struct MetricsCollector {
    metrics: Arc<RwLock<EngineMetrics>>,

    /// Recent build latencies for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(EngineMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(1_024))),
            max_samples: 10_000,
        }
    }

    /// Record a cache hit
    pub async fn record_cache_hit(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.ability_requests += 1;
        metrics.cache_hits += 1;
    }

    /// Record a cache miss
    pub async fn record_cache_miss(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.ability_requests += 1;
        metrics.cache_misses += 1;
    }

    /// Record a successful build
    pub async fn record_build(&self, latency: Duration, records_skipped: usize) {
        {
            let mut metrics = self.metrics.write().await;
            metrics.abilities_built += 1;
            metrics.records_skipped += records_skipped as u64;
        }
        self.record_latency(latency).await;
    }

    /// Record a failed build
    pub async fn record_build_failure(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.build_failures += 1;
    }

    async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            let excess = samples.len() - self.max_samples;
            samples.drain(0..excess);
        }

        let mut sorted = samples.clone();
        drop(samples);
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut metrics = self.metrics.write().await;
        metrics.avg_build_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        metrics.build_latency_p50_ms = Self::percentile(&sorted, 0.50);
        metrics.build_latency_p90_ms = Self::percentile(&sorted, 0.90);
        metrics.build_latency_p99_ms = Self::percentile(&sorted, 0.99);
    }

    /// Get current metrics snapshot
    pub async fn get_metrics(&self) -> EngineMetrics {
        self.metrics.read().await.clone()
    }

    /// Reset all metrics
    pub async fn reset(&self) {
        *self.metrics.write().await = EngineMetrics::default();
        self.latency_samples.write().await.clear();
    }

    /// Export metrics in Prometheus text format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.metrics.read().await;

        format!(
            r#"# HELP abac_ability_requests_total Total number of ability lookups
# TYPE abac_ability_requests_total counter
abac_ability_requests_total {}

# HELP abac_cache_hits_total Ability cache hits
# TYPE abac_cache_hits_total counter
abac_cache_hits_total {}

# HELP abac_cache_misses_total Ability cache misses
# TYPE abac_cache_misses_total counter
abac_cache_misses_total {}

# HELP abac_abilities_built_total Abilities compiled
# TYPE abac_abilities_built_total counter
abac_abilities_built_total {}

# HELP abac_build_failures_total Failed ability builds
# TYPE abac_build_failures_total counter
abac_build_failures_total {}

# HELP abac_records_skipped_total Permission records dropped during compilation
# TYPE abac_records_skipped_total counter
abac_records_skipped_total {}

# HELP abac_build_latency_seconds Ability build latency percentiles
# TYPE abac_build_latency_seconds summary
abac_build_latency_seconds{{quantile="0.5"}} {}
abac_build_latency_seconds{{quantile="0.9"}} {}
abac_build_latency_seconds{{quantile="0.99"}} {}
"#,
            metrics.ability_requests,
            metrics.cache_hits,
            metrics.cache_misses,
            metrics.abilities_built,
            metrics.build_failures,
            metrics.records_skipped,
            metrics.build_latency_p50_ms / 1000.0,
            metrics.build_latency_p90_ms / 1000.0,
            metrics.build_latency_p99_ms / 1000.0,
        )
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
