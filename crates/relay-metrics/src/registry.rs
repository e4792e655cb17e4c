use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use relay_common::{AttemptOutcome, CallOutcome, CallReport, FailureCategory};
use tracing::debug;

use crate::snapshot::{MethodMetrics, MetricsSnapshot, TargetMetrics};

const NUM_HISTOGRAM_BINS: usize = 100;

const NUM_CATEGORIES: usize = 6;

const CATEGORIES: [FailureCategory; NUM_CATEGORIES] = [
    FailureCategory::Resolution,
    FailureCategory::Connection,
    FailureCategory::MidCallIo,
    FailureCategory::Application,
    FailureCategory::Exhaustion,
    FailureCategory::BudgetExceeded,
];

fn category_index(category: FailureCategory) -> usize {
    match category {
        FailureCategory::Resolution => 0,
        FailureCategory::Connection => 1,
        FailureCategory::MidCallIo => 2,
        FailureCategory::Application => 3,
        FailureCategory::Exhaustion => 4,
        FailureCategory::BudgetExceeded => 5,
    }
}

/// Limits on the number of distinct keys the registry tracks.
///
/// When a limit is reached, the least recently recorded entry is evicted
/// to make room for a new one. Global counters are never affected.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub max_methods: usize,
    pub max_targets: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_methods: 1000,
            max_targets: 1000,
        }
    }
}

/// Logarithmic latency histogram.
///
/// Each power of ten is split into ten bins by leading digit, so bin `d * 10 + k`
/// covers `[k * 10^d, (k + 1) * 10^d)` microseconds. Latencies beyond the last
/// decade land in the last bin.
#[derive(Debug)]
pub(crate) struct LatencyHistogram {
    bins: [AtomicU64; NUM_HISTOGRAM_BINS],
    total_latency: AtomicU64,
    sample_count: AtomicU64,
}

impl LatencyHistogram {
    pub(crate) fn new() -> Self {
        Self {
            bins: std::array::from_fn(|_| AtomicU64::new(0)),
            total_latency: AtomicU64::new(0),
            sample_count: AtomicU64::new(0),
        }
    }

    pub(crate) fn record(&self, latency_us: u64) {
        self.bins[Self::bin_for(latency_us)].fetch_add(1, Ordering::Relaxed);
        self.total_latency.fetch_add(latency_us, Ordering::Relaxed);
        self.sample_count.fetch_add(1, Ordering::Relaxed);
    }

    fn bin_for(latency_us: u64) -> usize {
        if latency_us == 0 {
            return 0;
        }
        let decade = latency_us.ilog10();
        let leading = (latency_us / 10u64.pow(decade)) as usize;
        (decade as usize * 10 + leading).min(NUM_HISTOGRAM_BINS - 1)
    }

    /// Lower bound of a bin in microseconds.
    fn bin_floor(bin: usize) -> u64 {
        if bin == 0 {
            return 0;
        }
        let decade = (bin / 10) as u32;
        let leading = (bin % 10).max(1) as u64;
        10u64.saturating_pow(decade).saturating_mul(leading)
    }

    /// Estimates the latency at `percentile` (0-100), interpolating inside the
    /// bin that holds the target rank.
    pub(crate) fn percentile(&self, percentile: u64) -> u64 {
        let total = self.sample_count.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }

        let rank = (total * percentile).div_ceil(100).max(1);
        let mut seen = 0;
        for (bin, count) in self.bins.iter().enumerate() {
            let count = count.load(Ordering::Relaxed);
            if count > 0 && seen + count >= rank {
                let start = Self::bin_floor(bin);
                let end = Self::bin_floor(bin + 1).max(start + 1);
                let fraction = (rank - seen - 1) as f64 / count as f64;
                return start + (fraction * (end - start) as f64) as u64;
            }
            seen += count;
        }
        Self::bin_floor(NUM_HISTOGRAM_BINS)
    }

    /// Returns `(avg, p50, p95, p99)` in microseconds.
    pub(crate) fn summary(&self) -> (u64, u64, u64, u64) {
        let total = self.sample_count.load(Ordering::Relaxed);
        if total == 0 {
            return (0, 0, 0, 0);
        }
        let avg = self.total_latency.load(Ordering::Relaxed) / total;
        (avg, self.percentile(50), self.percentile(95), self.percentile(99))
    }
}

#[derive(Debug)]
struct MethodStats {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    attempts: AtomicU64,
    latencies: LatencyHistogram,
    last_seen: AtomicU64,
}

impl MethodStats {
    fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            latencies: LatencyHistogram::new(),
            last_seen: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> MethodMetrics {
        let (avg_latency_us, p50_latency_us, p95_latency_us, p99_latency_us) =
            self.latencies.summary();
        MethodMetrics {
            call_count: self.calls.load(Ordering::Relaxed),
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            attempt_count: self.attempts.load(Ordering::Relaxed),
            avg_latency_us,
            p50_latency_us,
            p95_latency_us,
            p99_latency_us,
        }
    }
}

#[derive(Debug)]
struct TargetStats {
    address: String,
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    last_seen: AtomicU64,
}

impl TargetStats {
    fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_seen: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> TargetMetrics {
        TargetMetrics {
            address: self.address.clone(),
            attempt_count: self.attempts.load(Ordering::Relaxed),
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
        }
    }
}

trait LastSeen {
    fn last_seen(&self) -> &AtomicU64;
}

impl LastSeen for MethodStats {
    fn last_seen(&self) -> &AtomicU64 {
        &self.last_seen
    }
}

impl LastSeen for TargetStats {
    fn last_seen(&self) -> &AtomicU64 {
        &self.last_seen
    }
}

/// Thread-safe registry of call metrics.
///
/// Global counters are lock-free atomics. Per-method and per-target entries
/// live behind an `RwLock`, which is held only to look up or insert an entry;
/// the counters inside each entry are atomics as well.
///
/// Recency for eviction is a logical clock (one tick per recorded report)
/// rather than wall time.
///
/// # Example
///
/// ```rust
/// use relay_metrics::MetricsRegistry;
///
/// let registry = MetricsRegistry::new();
/// let snapshot = registry.snapshot();
/// assert_eq!(snapshot.total_calls, 0);
/// ```
#[derive(Debug)]
pub struct MetricsRegistry {
    total_calls: AtomicU64,
    successful_calls: AtomicU64,
    failed_calls: AtomicU64,
    total_attempts: AtomicU64,
    failovers: AtomicU64,
    attempt_failures: [AtomicU64; NUM_CATEGORIES],
    call_failures: [AtomicU64; NUM_CATEGORIES],
    methods: RwLock<HashMap<String, Arc<MethodStats>>>,
    targets: RwLock<HashMap<u32, Arc<TargetStats>>>,
    clock: AtomicU64,
    start_time: Instant,
    config: MetricsConfig,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_config(MetricsConfig::default())
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            successful_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            total_attempts: AtomicU64::new(0),
            failovers: AtomicU64::new(0),
            attempt_failures: std::array::from_fn(|_| AtomicU64::new(0)),
            call_failures: std::array::from_fn(|_| AtomicU64::new(0)),
            methods: RwLock::new(HashMap::new()),
            targets: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            start_time: Instant::now(),
            config,
        }
    }

    /// Records one completed logical call.
    ///
    /// Updates the global counters, the method's latency histogram (using the
    /// call's total duration) and one target entry per attempt.
    pub fn record_report(&self, report: &CallReport) {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let attempts = report.attempt_count() as u64;

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.total_attempts.fetch_add(attempts, Ordering::Relaxed);
        self.failovers.fetch_add(report.failovers() as u64, Ordering::Relaxed);

        match report.outcome {
            CallOutcome::Succeeded => {
                self.successful_calls.fetch_add(1, Ordering::Relaxed);
            }
            CallOutcome::Failed(kind) => {
                self.failed_calls.fetch_add(1, Ordering::Relaxed);
                self.call_failures[category_index(kind.category())].fetch_add(1, Ordering::Relaxed);
            }
        }

        let method = entry(
            &self.methods,
            &report.method,
            self.config.max_methods,
            MethodStats::new,
        );
        method.calls.fetch_add(1, Ordering::Relaxed);
        method.attempts.fetch_add(attempts, Ordering::Relaxed);
        if report.is_success() {
            method.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            method.failures.fetch_add(1, Ordering::Relaxed);
        }
        method.latencies.record(duration_us(report.total_duration));
        method.last_seen.store(tick, Ordering::Relaxed);

        for attempt in &report.attempts {
            let target = entry(
                &self.targets,
                &attempt.target_checksum,
                self.config.max_targets,
                || TargetStats::new(&attempt.target_address),
            );
            target.attempts.fetch_add(1, Ordering::Relaxed);
            match attempt.outcome {
                AttemptOutcome::Succeeded => {
                    target.successes.fetch_add(1, Ordering::Relaxed);
                }
                AttemptOutcome::Failed { kind, .. } => {
                    target.failures.fetch_add(1, Ordering::Relaxed);
                    self.attempt_failures[category_index(kind.category())]
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
            target.last_seen.store(tick, Ordering::Relaxed);
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let methods = self
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, stats)| (name.clone(), stats.snapshot()))
            .collect();

        let targets = self
            .targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(checksum, stats)| (*checksum, stats.snapshot()))
            .collect();

        MetricsSnapshot {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            successful_calls: self.successful_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            failovers: self.failovers.load(Ordering::Relaxed),
            uptime_ms: self.uptime_ms(),
            attempt_failures: by_category(&self.attempt_failures),
            call_failures: by_category(&self.call_failures),
            methods,
            targets,
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_us(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn by_category(counters: &[AtomicU64; NUM_CATEGORIES]) -> BTreeMap<FailureCategory, u64> {
    CATEGORIES
        .iter()
        .map(|&category| (category, counters[category_index(category)].load(Ordering::Relaxed)))
        .filter(|&(_, count)| count > 0)
        .collect()
}

/// Looks up `key`, inserting a fresh entry (and evicting the least recently
/// seen one when the map is full) if it is missing.
fn entry<K, V, F>(map: &RwLock<HashMap<K, Arc<V>>>, key: &K, limit: usize, create: F) -> Arc<V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: LastSeen,
    F: FnOnce() -> V,
{
    if let Some(existing) = map.read().unwrap_or_else(PoisonError::into_inner).get(key) {
        return Arc::clone(existing);
    }

    let mut guard = map.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = guard.get(key) {
        return Arc::clone(existing);
    }

    if limit > 0 && guard.len() >= limit {
        let oldest = guard
            .iter()
            .min_by_key(|(_, stats)| stats.last_seen().load(Ordering::Relaxed))
            .map(|(k, _)| k.clone());
        if let Some(oldest) = oldest {
            debug!(key = ?oldest, "Evicting least recently seen metrics entry");
            guard.remove(&oldest);
        }
    }

    let stats = Arc::new(create());
    guard.insert(key.clone(), Arc::clone(&stats));
    stats
}
