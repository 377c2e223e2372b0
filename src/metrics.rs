//! Resolution metrics.
//!
//! Counters for where resolved strings came from and how the remote API
//! behaved. Each resolver owns its own set.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ResolverMetrics {
    /// Values found in the synced string cache
    cache_hits: AtomicUsize,

    /// Values found in the static string tables
    static_hits: AtomicUsize,

    /// Lookups where no candidate locale had a value
    misses: AtomicUsize,

    /// Missing keys that went through auto-creation
    strings_created: AtomicUsize,

    /// Create requests sent to the remote
    remote_calls: AtomicUsize,

    /// Create requests that failed and were absorbed
    remote_failures: AtomicUsize,
}

impl ResolverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_static_hit(&self) {
        self.static_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_string_created(&self) {
        self.strings_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn static_hits(&self) -> usize {
        self.static_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn strings_created(&self) -> usize {
        self.strings_created.load(Ordering::Relaxed)
    }

    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::Relaxed)
    }

    pub fn remote_failures(&self) -> usize {
        self.remote_failures.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let cache_hits = self.cache_hits();
        let static_hits = self.static_hits();
        let misses = self.misses();
        let lookups = cache_hits + static_hits + misses;
        let hit_rate = if lookups > 0 {
            ((cache_hits + static_hits) as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits,
            static_hits,
            misses,
            hit_rate,
            strings_created: self.strings_created(),
            remote_calls: self.remote_calls(),
            remote_failures: self.remote_failures(),
        }
    }
}

/// Snapshot of the resolver counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub static_hits: usize,
    pub misses: usize,

    /// Share of lookups answered by either tier, as a percentage (0-100)
    pub hit_rate: f64,

    pub strings_created: usize,
    pub remote_calls: usize,
    pub remote_failures: usize,
}
