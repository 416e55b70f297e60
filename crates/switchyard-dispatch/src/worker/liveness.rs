//! Consumer-group liveness bookkeeping.

use std::time::Duration;

use tokio::time::Instant;

/// Decides when a worker must heartbeat.
///
/// A heartbeat is due when the configured interval has elapsed since the last
/// one, or when one more record as slow as the slowest seen so far would
/// carry the worker past the liveness deadline.
#[derive(Debug, Clone)]
pub struct LivenessTracker {
    last_beat: Instant,
    interval: Duration,
    deadline: Duration,
    slowest_record: Duration,
}

impl LivenessTracker {
    /// Start tracking from now.
    #[must_use]
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self::starting_at(Instant::now(), interval, deadline)
    }

    /// Start tracking from `start`.
    #[must_use]
    pub fn starting_at(start: Instant, interval: Duration, deadline: Duration) -> Self {
        Self {
            last_beat: start,
            interval,
            deadline,
            slowest_record: Duration::ZERO,
        }
    }

    /// Time of the last successful heartbeat.
    #[must_use]
    pub fn last_beat(&self) -> Instant {
        self.last_beat
    }

    /// Longest observed per-record processing time.
    #[must_use]
    pub fn slowest_record(&self) -> Duration {
        self.slowest_record
    }

    /// Time since the last heartbeat, as of `now`.
    #[must_use]
    pub fn since_last(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_beat)
    }

    /// Whether a heartbeat should be sent before the next record.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        let since = self.since_last(now);
        since >= self.interval || since.saturating_add(self.slowest_record) >= self.deadline
    }

    /// Record how long one record took.
    pub fn observe(&mut self, elapsed: Duration) {
        self.slowest_record = self.slowest_record.max(elapsed);
    }

    /// Record a successful heartbeat at `now`.
    pub fn beat(&mut self, now: Instant) {
        self.last_beat = now;
    }
}
