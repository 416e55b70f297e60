//! Transport boundary.
//!
//! A transport offers per-key ordered, at-least-once delivery with explicit
//! acknowledgement and a consumer-group liveness heartbeat. The dispatch core
//! never retries on its own; retry policy belongs to the transport.

mod memory;

pub use memory::{InMemoryTransport, PartitionView};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use switchyard_events::PartitionKey;

use crate::error::TransportError;

/// Where the transport stored a submitted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitAck {
    /// Partition the payload landed on.
    pub partition: u32,
    /// Offset within that partition.
    pub offset: u64,
}

/// A payload handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRecord {
    /// Topic the record was read from.
    pub topic: String,
    /// Partition the record was read from.
    pub partition: u32,
    /// Offset within the partition.
    pub offset: u64,
    /// Partition key supplied at submission.
    pub key: PartitionKey,
    /// Encoded envelope.
    pub payload: Vec<u8>,
}

/// Client for a partitioned, acknowledged message transport.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Submit `payload` under `key`. Resolves once the transport accepted it.
    async fn submit(
        &self,
        topic: &str,
        key: PartitionKey,
        payload: Vec<u8>,
    ) -> Result<SubmitAck, TransportError>;

    /// Pull up to `max` records, waiting at most `timeout` for the first one.
    ///
    /// Returns an empty batch when nothing arrived in time.
    async fn poll_batch(
        &self,
        topic: &str,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<TransportRecord>, TransportError>;

    /// Mark a record as processed.
    async fn acknowledge(&self, record: &TransportRecord) -> Result<(), TransportError>;

    /// Signal consumer-group liveness.
    async fn heartbeat(&self) -> Result<(), TransportError>;
}
