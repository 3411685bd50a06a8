//! Request statistics: counters and streaming latency moments.
//!
//! Every resolved request moves counters at two scopes:
//!
//! - the global scope ([`ServiceStats`]), covering every request the tile
//!   surface receives, parseable or not;
//! - the project scope ([`Counters`]), shared between a project's canonical
//!   name and its aliases (one record, one lock domain).
//!
//! Latency samples feed the streaming moment accumulators
//! ([`RequestMoments`]) on successful requests only. The project-level
//! accumulator is created lazily on the first success; the global one always
//! exists. Accumulator state is append-only for the process lifetime; there
//! is no reset.
//!
//! Counter increments are atomic; the four-moment update is guarded by a
//! mutex since the recurrence is not decomposable into independent atomic
//! steps.

mod export;
mod moments;

pub use export::{
    munin_average_sizes, munin_config, munin_values, statistics_document, CounterSnapshot,
    LatencySnapshot, ProjectDocument, StatsDocument,
};
pub use moments::{zero_if_nan, RequestMoments};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// How a resolved request is classified for the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A tile (or the project's default tile) was served.
    Success,
    /// Nothing could be served: parse failure, unknown project, bad
    /// coordinates, backend error, or a miss with no fallback configured.
    Fail,
}

// =============================================================================
// Per-Project Counters
// =============================================================================

/// Request counters and latency statistics for one project.
///
/// A project and all of its aliases share a single `Counters` record, so an
/// increment through an alias is observable through the canonical name.
#[derive(Debug, Default)]
pub struct Counters {
    requests: AtomicU64,
    success: AtomicU64,
    fail: AtomicU64,

    /// Recency-weighted running average of served tile sizes, seeded with
    /// the first observed size: avg' = (avg + size) / 2.
    average_size: Mutex<Option<u64>>,

    /// Latency moments, created on the first successful request.
    latency: Mutex<Option<RequestMoments>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self, latency_ms: f64, size_bytes: u64) {
        self.success.fetch_add(1, Ordering::Relaxed);

        {
            let mut latency = self.latency.lock().unwrap();
            latency.get_or_insert_with(RequestMoments::new).push(latency_ms);
        }

        let mut average = self.average_size.lock().unwrap();
        *average = Some(match *average {
            Some(avg) => (avg + size_bytes) / 2,
            None => size_bytes,
        });
    }

    fn record_fail(&self) {
        self.fail.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn fail(&self) -> u64 {
        self.fail.load(Ordering::Relaxed)
    }

    /// Average served tile size; None until the first success.
    pub fn average_size(&self) -> Option<u64> {
        *self.average_size.lock().unwrap()
    }

    /// Snapshot of the latency moments; None until the first success.
    pub fn latency(&self) -> Option<RequestMoments> {
        self.latency.lock().unwrap().clone()
    }
}

// =============================================================================
// Service-Wide Statistics
// =============================================================================

/// The service-wide statistics record.
///
/// Owns the global counters and the always-present global latency
/// accumulator, and is the single entry point ([`ServiceStats::record`]) for
/// moving counters after a request resolves.
#[derive(Debug)]
pub struct ServiceStats {
    hostname: String,
    started: Instant,
    requests: AtomicU64,
    success: AtomicU64,
    fail: AtomicU64,
    latency: Mutex<RequestMoments>,
}

impl ServiceStats {
    /// Create the statistics record, capturing the host name and start time.
    pub fn new() -> Self {
        Self::with_hostname(gethostname::gethostname().to_string_lossy().into_owned())
    }

    pub fn with_hostname(hostname: String) -> Self {
        Self {
            hostname,
            started: Instant::now(),
            requests: AtomicU64::new(0),
            success: AtomicU64::new(0),
            fail: AtomicU64::new(0),
            latency: Mutex::new(RequestMoments::new()),
        }
    }

    /// Record one completed request.
    ///
    /// Global counters always move. Project counters move identically when
    /// the request resolved to a project. Latency feeds the accumulators only
    /// on success, and the served size updates the project's running average.
    pub fn record(
        &self,
        project: Option<&Counters>,
        outcome: RequestOutcome,
        latency_ms: f64,
        size_bytes: u64,
    ) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(counters) = project {
            counters.record_request();
        }

        match outcome {
            RequestOutcome::Success => {
                self.success.fetch_add(1, Ordering::Relaxed);
                self.latency.lock().unwrap().push(latency_ms);
                if let Some(counters) = project {
                    counters.record_success(latency_ms, size_bytes);
                }
            }
            RequestOutcome::Fail => {
                self.fail.fetch_add(1, Ordering::Relaxed);
                if let Some(counters) = project {
                    counters.record_fail();
                }
            }
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Seconds since the statistics record was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn fail(&self) -> u64 {
        self.fail.load(Ordering::Relaxed)
    }

    /// Snapshot of the global latency moments.
    pub fn latency(&self) -> RequestMoments {
        self.latency.lock().unwrap().clone()
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
