//! Delivery adapters.
//!
//! An adapter decides how a validated publish reaches subscribers: directly
//! in the caller's task, through the distributed transport, or both.

mod composite;
mod distributed;
mod inline;

pub use composite::CompositeAdapter;
pub use distributed::DistributedAdapter;
pub use inline::InlineAdapter;

use std::fmt;

use async_trait::async_trait;
use switchyard_events::{Attributes, EventSchemaRegistry, PartitionKey};

use crate::error::PublishResult;
use crate::pipeline::PublishPipeline;

/// Outcome of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReceipt {
    /// Handlers ran in the publisher's task.
    Inline {
        /// Number of handlers invoked.
        handlers: usize,
    },
    /// The transport accepted the envelope.
    Submitted {
        /// Key the envelope was submitted under.
        partition_key: PartitionKey,
        /// Partition the transport placed it on.
        partition: u32,
        /// Offset within that partition.
        offset: u64,
        /// Consume flag stamped on the envelope.
        should_consume: bool,
    },
    /// The throttle skipped the transport for this publish.
    Throttled,
    /// Receipts of every member adapter, in order.
    Composite(Vec<DeliveryReceipt>),
}

/// Strategy for delivering a validated event.
#[async_trait]
pub trait DeliveryAdapter: Send + Sync + fmt::Debug {
    /// Short adapter name for logs and errors.
    fn name(&self) -> &'static str;

    /// Check adapter settings against the registry before traffic starts.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Event`](crate::PublishError::Event) when a
    /// setting refers to an event or attribute the registry does not declare.
    fn verify(&self, _registry: &EventSchemaRegistry) -> PublishResult<()> {
        Ok(())
    }

    /// Deliver an event whose attributes already passed schema validation.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`](crate::PublishError) describing the failed
    /// path. Adapters never retry.
    async fn deliver(
        &self,
        pipeline: &PublishPipeline,
        event_name: &str,
        attributes: &Attributes,
    ) -> PublishResult<DeliveryReceipt>;
}
