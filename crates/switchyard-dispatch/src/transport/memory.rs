//! In-process partitioned log.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use switchyard_events::PartitionKey;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{SubmitAck, Transport, TransportRecord};
use crate::error::TransportError;

#[derive(Debug)]
struct Stored {
    key: PartitionKey,
    payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct PartitionLog {
    records: Vec<Stored>,
    /// Everything below this offset is acknowledged.
    committed: u64,
    /// Next offset handed to a consumer.
    next: u64,
    /// Acknowledged offsets at or above `committed`.
    acked: BTreeSet<u64>,
}

impl PartitionLog {
    fn len(&self) -> u64 {
        u64::try_from(self.records.len()).unwrap_or(u64::MAX)
    }

    fn acknowledge(&mut self, offset: u64) {
        if offset < self.committed || offset >= self.len() {
            return;
        }
        self.acked.insert(offset);
        while self.acked.remove(&self.committed) {
            self.committed = self.committed.saturating_add(1);
        }
    }
}

#[derive(Debug)]
struct TopicLog {
    partitions: Vec<PartitionLog>,
    /// Partition the next poll starts from.
    cursor: usize,
}

impl TopicLog {
    fn new(count: u32) -> Self {
        Self {
            partitions: (0..count).map(|_| PartitionLog::default()).collect(),
            cursor: 0,
        }
    }
}

/// Partitioned, acknowledged log kept in memory.
///
/// Records with the same partition key land on the same partition and are
/// handed out in submission order. Acknowledgements advance a per-partition
/// committed offset; [`rewind_uncommitted`](Self::rewind_uncommitted)
/// redelivers everything past it, which models a consumer-group rebalance.
#[derive(Debug)]
pub struct InMemoryTransport {
    partitions: u32,
    topics: Mutex<HashMap<String, TopicLog>>,
    arrivals: Notify,
    heartbeats: AtomicU64,
    fail_submits: AtomicBool,
}

impl InMemoryTransport {
    /// Create a transport with `partitions` partitions per topic (at least 1).
    #[must_use]
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
            topics: Mutex::new(HashMap::new()),
            arrivals: Notify::new(),
            heartbeats: AtomicU64::new(0),
            fail_submits: AtomicBool::new(false),
        }
    }

    /// Partitions per topic.
    #[must_use]
    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Restrict consumption to a subset of partitions.
    #[must_use]
    pub fn assign(self: &Arc<Self>, partitions: impl IntoIterator<Item = u32>) -> PartitionView {
        PartitionView {
            inner: Arc::clone(self),
            partitions: partitions.into_iter().collect(),
        }
    }

    /// Make every subsequent submit fail with [`TransportError::Unavailable`].
    pub fn set_fail_submits(&self, fail: bool) {
        self.fail_submits.store(fail, Ordering::Release);
    }

    /// Heartbeats received so far.
    #[must_use]
    pub fn heartbeat_count(&self) -> u64 {
        self.heartbeats.load(Ordering::Acquire)
    }

    /// Total records ever submitted to `topic`.
    #[must_use]
    pub fn submitted(&self, topic: &str) -> u64 {
        self.lock().get(topic).map_or(0, |log| {
            log.partitions
                .iter()
                .fold(0u64, |acc, p| acc.saturating_add(p.len()))
        })
    }

    /// Records in `topic` not yet acknowledged.
    #[must_use]
    pub fn uncommitted(&self, topic: &str) -> u64 {
        self.lock().get(topic).map_or(0, |log| {
            log.partitions.iter().fold(0u64, |acc, p| {
                let open = p.len().saturating_sub(p.committed);
                let acked_ahead = u64::try_from(p.acked.len()).unwrap_or(u64::MAX);
                acc.saturating_add(open.saturating_sub(acked_ahead))
            })
        })
    }

    /// Committed offset of one partition.
    #[must_use]
    pub fn committed(&self, topic: &str, partition: u32) -> u64 {
        let topics = self.lock();
        let Some(log) = topics.get(topic) else {
            return 0;
        };
        usize::try_from(partition)
            .ok()
            .and_then(|idx| log.partitions.get(idx))
            .map_or(0, |p| p.committed)
    }

    /// Payloads of one partition in offset order.
    #[must_use]
    pub fn partition_payloads(&self, topic: &str, partition: u32) -> Vec<Vec<u8>> {
        let topics = self.lock();
        let Some(log) = topics.get(topic) else {
            return Vec::new();
        };
        usize::try_from(partition)
            .ok()
            .and_then(|idx| log.partitions.get(idx))
            .map(|p| p.records.iter().map(|r| r.payload.clone()).collect())
            .unwrap_or_default()
    }

    /// Make every unacknowledged record of `topic` deliverable again.
    ///
    /// Returns how many records will be redelivered.
    pub fn rewind_uncommitted(&self, topic: &str) -> u64 {
        let mut topics = self.lock();
        let Some(log) = topics.get_mut(topic) else {
            return 0;
        };
        let mut rewound: u64 = 0;
        for partition in &mut log.partitions {
            rewound = rewound.saturating_add(partition.next.saturating_sub(partition.committed));
            partition.next = partition.committed;
            partition.acked.clear();
        }
        drop(topics);
        if rewound > 0 {
            debug!(topic, rewound, "Rewound uncommitted records");
            self.arrivals.notify_waiters();
        }
        rewound
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TopicLog>> {
        // The log stays consistent even if a holder panicked mid-poll.
        self.topics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn do_submit(
        &self,
        topic: &str,
        key: PartitionKey,
        payload: Vec<u8>,
    ) -> Result<SubmitAck, TransportError> {
        if self.fail_submits.load(Ordering::Acquire) {
            warn!(topic, "Submit rejected by failure injection");
            return Err(TransportError::Unavailable("submit failure injected".to_owned()));
        }

        let partition = key.partition(self.partitions);
        let mut topics = self.lock();
        let log = topics
            .entry(topic.to_owned())
            .or_insert_with(|| TopicLog::new(self.partitions));
        let slot = usize::try_from(partition)
            .ok()
            .and_then(|idx| log.partitions.get_mut(idx))
            .ok_or_else(|| TransportError::Rejected(format!("no partition {partition}")))?;
        let offset = slot.len();
        slot.records.push(Stored { key, payload });
        drop(topics);

        self.arrivals.notify_waiters();
        Ok(SubmitAck { partition, offset })
    }

    fn take(&self, topic: &str, max: usize, only: Option<&[u32]>) -> Vec<TransportRecord> {
        let mut topics = self.lock();
        let Some(log) = topics.get_mut(topic) else {
            return Vec::new();
        };

        let count = log.partitions.len();
        let mut batch = Vec::new();
        for step in 0..count {
            if batch.len() >= max {
                break;
            }
            let idx = log.cursor.saturating_add(step).checked_rem(count).unwrap_or(0);
            let Ok(partition) = u32::try_from(idx) else {
                continue;
            };
            if only.is_some_and(|allowed| !allowed.contains(&partition)) {
                continue;
            }
            let Some(slot) = log.partitions.get_mut(idx) else {
                continue;
            };
            while batch.len() < max && slot.next < slot.len() {
                let offset = slot.next;
                let Some(stored) = usize::try_from(offset)
                    .ok()
                    .and_then(|o| slot.records.get(o))
                else {
                    break;
                };
                batch.push(TransportRecord {
                    topic: topic.to_owned(),
                    partition,
                    offset,
                    key: stored.key,
                    payload: stored.payload.clone(),
                });
                slot.next = offset.saturating_add(1);
            }
        }
        log.cursor = log.cursor.saturating_add(1).checked_rem(count).unwrap_or(0);
        batch
    }

    async fn poll_filtered(
        &self,
        topic: &str,
        max: usize,
        timeout: Duration,
        only: Option<&[u32]>,
    ) -> Vec<TransportRecord> {
        if max == 0 {
            return Vec::new();
        }
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            let batch = self.take(topic, max, only);
            if !batch.is_empty() {
                return batch;
            }
            let Some(deadline) = deadline else {
                arrival.await;
                continue;
            };
            if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                return Vec::new();
            }
        }
    }

    fn do_acknowledge(&self, record: &TransportRecord) -> Result<(), TransportError> {
        let mut topics = self.lock();
        let slot = topics
            .get_mut(&record.topic)
            .and_then(|log| {
                usize::try_from(record.partition)
                    .ok()
                    .and_then(|idx| log.partitions.get_mut(idx))
            })
            .ok_or_else(|| {
                TransportError::Rejected(format!(
                    "unknown partition {}/{}",
                    record.topic, record.partition
                ))
            })?;
        slot.acknowledge(record.offset);
        Ok(())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn submit(
        &self,
        topic: &str,
        key: PartitionKey,
        payload: Vec<u8>,
    ) -> Result<SubmitAck, TransportError> {
        self.do_submit(topic, key, payload)
    }

    async fn poll_batch(
        &self,
        topic: &str,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<TransportRecord>, TransportError> {
        Ok(self.poll_filtered(topic, max, timeout, None).await)
    }

    async fn acknowledge(&self, record: &TransportRecord) -> Result<(), TransportError> {
        self.do_acknowledge(record)
    }

    async fn heartbeat(&self) -> Result<(), TransportError> {
        self.heartbeats.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// A consumer's view of an [`InMemoryTransport`] limited to assigned partitions.
#[derive(Debug, Clone)]
pub struct PartitionView {
    inner: Arc<InMemoryTransport>,
    partitions: Vec<u32>,
}

impl PartitionView {
    /// Assigned partitions.
    #[must_use]
    pub fn partitions(&self) -> &[u32] {
        &self.partitions
    }
}

#[async_trait]
impl Transport for PartitionView {
    async fn submit(
        &self,
        topic: &str,
        key: PartitionKey,
        payload: Vec<u8>,
    ) -> Result<SubmitAck, TransportError> {
        self.inner.do_submit(topic, key, payload)
    }

    async fn poll_batch(
        &self,
        topic: &str,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<TransportRecord>, TransportError> {
        Ok(self
            .inner
            .poll_filtered(topic, max, timeout, Some(&self.partitions))
            .await)
    }

    async fn acknowledge(&self, record: &TransportRecord) -> Result<(), TransportError> {
        if !self.partitions.contains(&record.partition) {
            return Err(TransportError::Rejected(format!(
                "partition {} is not assigned to this consumer",
                record.partition
            )));
        }
        self.inner.do_acknowledge(record)
    }

    async fn heartbeat(&self) -> Result<(), TransportError> {
        self.inner.heartbeat().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PartitionKey {
        PartitionKey::from_bytes([byte; 32])
    }

    #[tokio::test]
    async fn test_same_key_keeps_order() {
        let transport = InMemoryTransport::new(4);
        for n in 0..5u8 {
            transport.submit("t", key(7), vec![n]).await.unwrap();
        }
        let batch = transport
            .poll_batch("t", 10, Duration::from_millis(10))
            .await
            .unwrap();
        let payloads: Vec<u8> = batch.iter().map(|r| r.payload[0]).collect();
        assert_eq!(payloads, vec![0, 1, 2, 3, 4]);
        assert!(batch.iter().all(|r| r.partition == key(7).partition(4)));
    }

    #[tokio::test]
    async fn test_poll_respects_max() {
        let transport = InMemoryTransport::new(1);
        for n in 0..5u8 {
            transport.submit("t", key(1), vec![n]).await.unwrap();
        }
        let first = transport.poll_batch("t", 2, Duration::ZERO).await.unwrap();
        let second = transport.poll_batch("t", 10, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].offset, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_poll_times_out() {
        let transport = InMemoryTransport::new(2);
        let started = Instant::now();
        let batch = transport
            .poll_batch("t", 10, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(batch.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_poll_wakes_on_submit() {
        let transport = Arc::new(InMemoryTransport::new(2));
        let poller = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                transport
                    .poll_batch("t", 10, Duration::from_secs(30))
                    .await
                    .unwrap()
            })
        };
        tokio::task::yield_now().await;
        transport.submit("t", key(3), b"x".to_vec()).await.unwrap();
        let batch = poller.await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_advances_in_order() {
        let transport = InMemoryTransport::new(1);
        for n in 0..3u8 {
            transport.submit("t", key(1), vec![n]).await.unwrap();
        }
        let batch = transport.poll_batch("t", 10, Duration::ZERO).await.unwrap();

        transport.acknowledge(&batch[1]).await.unwrap();
        assert_eq!(transport.committed("t", 0), 0);
        assert_eq!(transport.uncommitted("t"), 2);

        transport.acknowledge(&batch[0]).await.unwrap();
        assert_eq!(transport.committed("t", 0), 2);
        assert_eq!(transport.uncommitted("t"), 1);
    }

    #[tokio::test]
    async fn test_rewind_redelivers_unacked() {
        let transport = InMemoryTransport::new(1);
        for n in 0..3u8 {
            transport.submit("t", key(1), vec![n]).await.unwrap();
        }
        let batch = transport.poll_batch("t", 10, Duration::ZERO).await.unwrap();
        transport.acknowledge(&batch[0]).await.unwrap();

        assert_eq!(transport.rewind_uncommitted("t"), 2);
        let again = transport.poll_batch("t", 10, Duration::ZERO).await.unwrap();
        let offsets: Vec<u64> = again.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let transport = InMemoryTransport::new(1);
        transport.set_fail_submits(true);
        assert!(matches!(
            transport.submit("t", key(1), Vec::new()).await,
            Err(TransportError::Unavailable(_))
        ));
        transport.set_fail_submits(false);
        assert!(transport.submit("t", key(1), Vec::new()).await.is_ok());
        assert_eq!(transport.submitted("t"), 1);
    }

    #[tokio::test]
    async fn test_views_split_partitions() {
        let transport = Arc::new(InMemoryTransport::new(2));
        let mut keys = Vec::new();
        for byte in 0..=255u8 {
            let k = key(byte);
            if keys.iter().all(|existing: &PartitionKey| existing.partition(2) != k.partition(2)) {
                keys.push(k);
            }
            if keys.len() == 2 {
                break;
            }
        }
        for k in &keys {
            transport.submit("t", *k, b"p".to_vec()).await.unwrap();
        }

        let left = transport.assign([0]);
        let right = transport.assign([1]);
        let a = left.poll_batch("t", 10, Duration::ZERO).await.unwrap();
        let b = right.poll_batch("t", 10, Duration::ZERO).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].partition, 0);
        assert_eq!(b[0].partition, 1);
        assert!(left.acknowledge(&b[0]).await.is_err());
        assert!(right.acknowledge(&b[0]).await.is_ok());
    }

    #[tokio::test]
    async fn test_heartbeat_counter() {
        let transport = Arc::new(InMemoryTransport::new(1));
        transport.heartbeat().await.unwrap();
        transport.assign([0]).heartbeat().await.unwrap();
        assert_eq!(transport.heartbeat_count(), 2);
    }
}
