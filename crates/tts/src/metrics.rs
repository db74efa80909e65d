use std::sync::{Mutex, MutexGuard};

use recital_telemetry::{
    Counter, Histogram, KeyValue,
    metrics::{CACHE_OUTCOME, TTS_CACHE_RECLAIMED, TTS_CACHE_REQUESTS, TTS_SYNTHESIS_DURATION, meter},
};

use crate::types::CacheMetrics;

/// How a completed request was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache
    Hit,
    /// Synthesized
    Miss,
    /// Synthesis was attempted and failed; counted as a miss
    Failed,
}

impl Outcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Failed => "error",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    total_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    avg_generation_time_seconds: f64,
}

/// Process-wide request counters and mean request latency
///
/// Outcomes are also exported on the global OpenTelemetry meter.
pub struct MetricsAggregator {
    counters: Mutex<Counters>,
    requests: Counter<u64>,
    duration: Histogram<f64>,
    reclaimed: Counter<u64>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregator {
    pub fn new() -> Self {
        let meter = meter();

        Self {
            counters: Mutex::default(),
            requests: meter
                .u64_counter(TTS_CACHE_REQUESTS)
                .with_description("Speech requests by cache outcome")
                .build(),
            duration: meter
                .f64_histogram(TTS_SYNTHESIS_DURATION)
                .with_description("Time to serve a speech request")
                .with_unit("s")
                .build(),
            reclaimed: meter
                .u64_counter(TTS_CACHE_RECLAIMED)
                .with_description("Expired audio entries removed by maintenance")
                .build(),
        }
    }

    /// Record one completed request
    ///
    /// The mean is updated incrementally:
    /// `avg' = avg + (elapsed - avg) / total_requests'`.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_outcome(&self, outcome: Outcome, elapsed_seconds: f64) {
        {
            let mut counters = self.lock();
            counters.total_requests += 1;
            if outcome == Outcome::Hit {
                counters.cache_hits += 1;
            } else {
                counters.cache_misses += 1;
            }
            counters.avg_generation_time_seconds +=
                (elapsed_seconds - counters.avg_generation_time_seconds) / counters.total_requests as f64;
        }

        let attributes = [KeyValue::new(CACHE_OUTCOME, outcome.label())];
        self.requests.add(1, &attributes);
        self.duration.record(elapsed_seconds, &attributes);
    }

    pub fn record_reclaimed(&self, removed: usize) {
        self.reclaimed.add(removed as u64, &[]);
    }

    /// Copy of the counters with the given cache size filled in
    pub fn snapshot(&self, total_cache_size_bytes: u64) -> CacheMetrics {
        let counters = *self.lock();

        CacheMetrics {
            total_requests: counters.total_requests,
            cache_hits: counters.cache_hits,
            cache_misses: counters.cache_misses,
            avg_generation_time_seconds: counters.avg_generation_time_seconds,
            total_cache_size_bytes,
        }
    }

    /// Percentage of requests served from the cache; 0 before any request
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let counters = *self.lock();
        counters.cache_hits as f64 / counters.total_requests.max(1) as f64 * 100.0
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}
