//! Instrumentation boundary.
//!
//! The dispatch core only needs to bump named counters per event. Sinks must
//! never block or fail the caller.

use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use serde::Serialize;
use tracing::trace;

/// Counters emitted by the dispatch core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    /// A publish was accepted by the delivery adapter.
    Published,
    /// A consumer dispatched a message to local subscribers.
    Consumed,
    /// A consumer acknowledged a message without dispatching it.
    Skipped,
    /// A local dispatch returned a handler failure.
    DispatchFailed,
    /// A consumer could not decode or validate a message.
    DecodeFailed,
    /// A publish was not forwarded to the transport by the throttle.
    Throttled,
}

impl Counter {
    /// Stable counter name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Consumed => "consumed",
            Self::Skipped => "skipped",
            Self::DispatchFailed => "dispatch_failed",
            Self::DecodeFailed => "decode_failed",
            Self::Throttled => "throttled",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget counter sink.
pub trait MetricsSink: Send + Sync + fmt::Debug {
    /// Increment `counter` for `event`.
    fn increment(&self, counter: Counter, event: &str);
}

/// Discards every increment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _counter: Counter, _event: &str) {}
}

/// Emits each increment as a `trace`-level event for log-based collection.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn increment(&self, counter: Counter, event: &str) {
        trace!(target: "switchyard::metrics", counter = %counter, event = event, "counter");
    }
}

/// Keeps counts in memory. Useful for tests and the CLI simulation.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counts: DashMap<(Counter, String), u64>,
}

impl InMemoryMetrics {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `counter` and `event`.
    #[must_use]
    pub fn get(&self, counter: Counter, event: &str) -> u64 {
        self.counts
            .get(&(counter, event.to_owned()))
            .map_or(0, |entry| *entry.value())
    }

    /// Sum of `counter` across all events.
    #[must_use]
    pub fn total(&self, counter: Counter) -> u64 {
        self.counts
            .iter()
            .filter(|entry| entry.key().0 == counter)
            .fold(0u64, |acc, entry| acc.saturating_add(*entry.value()))
    }

    /// Sorted copy of all counts, keyed by `(counter, event)`.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<(Counter, String), u64> {
        self.counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, counter: Counter, event: &str) {
        let mut entry = self.counts.entry((counter, event.to_owned())).or_insert(0);
        *entry = entry.saturating_add(1);
    }
}
