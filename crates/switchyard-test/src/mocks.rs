//! Mock implementations for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use switchyard_dispatch::{
    HandlerError, InMemoryTransport, Subscriber, SubmitAck, Transport, TransportError,
    TransportRecord,
};
use switchyard_events::{Attributes, PartitionKey};
use tokio::time::Instant;

/// Handler that records every attribute map it receives.
///
/// Clones share the same record, so a test can keep one copy and hand
/// another to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<Attributes>>>,
}

impl RecordingHandler {
    /// Create a handler with an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this handler in a subscriber.
    #[must_use]
    pub fn subscriber<I, S>(&self, name: &str, parameters: I) -> Subscriber
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let calls = Arc::clone(&self.calls);
        Subscriber::new(name, parameters, move |attributes: &Attributes| {
            if let Ok(mut guard) = calls.lock() {
                guard.push(attributes.clone());
            }
            Ok(())
        })
    }

    /// Every attribute map received, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<Attributes> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of calls.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.lock().map(|g| g.len()).unwrap_or_default()
    }

    /// Values of one attribute across all calls, in call order.
    #[must_use]
    pub fn values_of(&self, attribute: &str) -> Vec<serde_json::Value> {
        self.calls()
            .into_iter()
            .filter_map(|mut attrs| attrs.remove(attribute))
            .collect()
    }
}

/// Handler that fails a configurable number of times.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: String,
    remaining: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FailingHandler {
    /// Fail on every call.
    #[must_use]
    pub fn always(message: impl Into<String>) -> Self {
        Self::times(usize::MAX, message)
    }

    /// Fail on the first `count` calls, then succeed.
    #[must_use]
    pub fn times(count: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            remaining: Arc::new(AtomicUsize::new(count)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrap this handler in a subscriber.
    #[must_use]
    pub fn subscriber<I, S>(&self, name: &str, parameters: I) -> Subscriber
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handler = self.clone();
        Subscriber::new(name, parameters, move |_: &Attributes| handler.call())
    }

    /// Number of calls, failed or not.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn call(&self) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(HandlerError::new(self.message.clone()))
        } else {
            Ok(())
        }
    }
}

/// Transport that delegates to an [`InMemoryTransport`] and records traffic.
///
/// Acknowledgements can be slowed down to simulate long per-record work, and
/// heartbeats can be made to fail.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    inner: Arc<InMemoryTransport>,
    heartbeats: Arc<Mutex<Vec<Instant>>>,
    acked: Arc<Mutex<Vec<(u32, u64)>>>,
    ack_delay: Duration,
    fail_heartbeats: Arc<AtomicBool>,
}

impl RecordingTransport {
    /// Wrap a fresh in-memory transport with `partitions` partitions.
    #[must_use]
    pub fn new(partitions: u32) -> Self {
        Self::wrapping(Arc::new(InMemoryTransport::new(partitions)))
    }

    /// Wrap an existing in-memory transport.
    #[must_use]
    pub fn wrapping(inner: Arc<InMemoryTransport>) -> Self {
        Self {
            inner,
            heartbeats: Arc::new(Mutex::new(Vec::new())),
            acked: Arc::new(Mutex::new(Vec::new())),
            ack_delay: Duration::ZERO,
            fail_heartbeats: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sleep this long inside every acknowledgement.
    #[must_use]
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = delay;
        self
    }

    /// Make heartbeats fail (or succeed again).
    pub fn set_fail_heartbeats(&self, fail: bool) {
        self.fail_heartbeats.store(fail, Ordering::SeqCst);
    }

    /// The wrapped transport.
    #[must_use]
    pub fn inner(&self) -> &Arc<InMemoryTransport> {
        &self.inner
    }

    /// When each successful heartbeat happened.
    #[must_use]
    pub fn heartbeat_times(&self) -> Vec<Instant> {
        self.heartbeats.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// `(partition, offset)` of every acknowledged record, in order.
    #[must_use]
    pub fn acknowledged(&self) -> Vec<(u32, u64)> {
        self.acked.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Largest gap between consecutive heartbeats, measured from `start` to `end`.
    #[must_use]
    pub fn longest_heartbeat_gap(&self, start: Instant, end: Instant) -> Duration {
        let mut previous = start;
        let mut longest = Duration::ZERO;
        for beat in self.heartbeat_times().into_iter().chain(std::iter::once(end)) {
            longest = longest.max(beat.saturating_duration_since(previous));
            previous = beat;
        }
        longest
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn submit(
        &self,
        topic: &str,
        key: PartitionKey,
        payload: Vec<u8>,
    ) -> Result<SubmitAck, TransportError> {
        self.inner.submit(topic, key, payload).await
    }

    async fn poll_batch(
        &self,
        topic: &str,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<TransportRecord>, TransportError> {
        self.inner.poll_batch(topic, max, timeout).await
    }

    async fn acknowledge(&self, record: &TransportRecord) -> Result<(), TransportError> {
        if !self.ack_delay.is_zero() {
            tokio::time::sleep(self.ack_delay).await;
        }
        self.inner.acknowledge(record).await?;
        if let Ok(mut guard) = self.acked.lock() {
            guard.push((record.partition, record.offset));
        }
        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), TransportError> {
        if self.fail_heartbeats.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("group coordinator unreachable".to_owned()));
        }
        self.inner.heartbeat().await?;
        if let Ok(mut guard) = self.heartbeats.lock() {
            guard.push(Instant::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_events::attributes;

    #[test]
    fn test_failing_handler_recovers() {
        let handler = FailingHandler::times(2, "nope");
        assert!(handler.call().is_err());
        assert!(handler.call().is_err());
        assert!(handler.call().is_ok());
        assert_eq!(handler.count(), 3);
    }

    #[test]
    fn test_recording_handler_shares_record() {
        let handler = RecordingHandler::new();
        let copy = handler.clone();
        if let Ok(mut guard) = copy.calls.lock() {
            guard.push(attributes([("a", 1)]));
        }
        assert_eq!(handler.count(), 1);
        assert_eq!(handler.values_of("a"), vec![serde_json::json!(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_gap() {
        let transport = RecordingTransport::new(1);
        let start = Instant::now();
        tokio::time::sleep(Duration::from_secs(4)).await;
        transport.heartbeat().await.unwrap();
        tokio::time::sleep(Duration::from_secs(7)).await;
        transport.heartbeat().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            transport.longest_heartbeat_gap(start, Instant::now()),
            Duration::from_secs(7)
        );
        assert_eq!(transport.inner().heartbeat_count(), 2);
    }
}
