use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use rand::Rng;
use switchyard_events::{Attributes, Envelope, EventSchemaRegistry, PartitionKeyResolver};
use switchyard_telemetry::Counter;
use tracing::{debug, info, warn};

use super::{DeliveryAdapter, DeliveryReceipt};
use crate::cutover::CutoverController;
use crate::error::PublishResult;
use crate::pipeline::PublishPipeline;
use crate::transport::Transport;

/// Submits events to the distributed transport.
///
/// The envelope carries the consume flag as read at publish time. Only the
/// transport's acknowledgement is awaited; subscribers run later on a
/// consumer worker.
#[derive(Debug)]
pub struct DistributedAdapter {
    transport: Arc<dyn Transport>,
    resolver: PartitionKeyResolver,
    cutover: Arc<dyn CutoverController>,
    throttle_percent: AtomicU8,
}

impl DistributedAdapter {
    /// Create an adapter forwarding every publish.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        resolver: PartitionKeyResolver,
        cutover: Arc<dyn CutoverController>,
    ) -> Self {
        Self {
            transport,
            resolver,
            cutover,
            throttle_percent: AtomicU8::new(100),
        }
    }

    /// Set the initial throttle percentage.
    #[must_use]
    pub fn with_throttle_percent(self, percent: u8) -> Self {
        self.set_throttle_percent(percent);
        self
    }

    /// Share (0-100) of publishes forwarded to the transport.
    #[must_use]
    pub fn throttle_percent(&self) -> u8 {
        self.throttle_percent.load(Ordering::Acquire)
    }

    /// Change the forwarded share at runtime. Values above 100 clamp to 100.
    pub fn set_throttle_percent(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.throttle_percent.swap(percent, Ordering::AcqRel);
        if previous != percent {
            info!(previous, percent, "Distributed throttle changed");
        }
    }

    fn sampled(&self) -> bool {
        match self.throttle_percent() {
            0 => false,
            100.. => true,
            percent => rand::thread_rng().gen_range(0..100u8) < percent,
        }
    }
}

#[async_trait]
impl DeliveryAdapter for DistributedAdapter {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn verify(&self, registry: &EventSchemaRegistry) -> PublishResult<()> {
        self.resolver.check(registry)?;
        Ok(())
    }

    async fn deliver(
        &self,
        pipeline: &PublishPipeline,
        event_name: &str,
        attributes: &Attributes,
    ) -> PublishResult<DeliveryReceipt> {
        if !self.sampled() {
            pipeline.metrics().increment(Counter::Throttled, event_name);
            debug!(event = event_name, "Publish skipped transport by throttle");
            return Ok(DeliveryReceipt::Throttled);
        }

        let partition_key = self.resolver.resolve(event_name, attributes)?;
        let should_consume = self.cutover.is_consume_enabled();
        let envelope = Envelope::new(event_name, attributes.clone(), should_consume, partition_key);
        let payload = envelope.encode()?;

        let ack = self
            .transport
            .submit(pipeline.topic(), partition_key, payload)
            .await
            .inspect_err(|e| {
                warn!(
                    event = event_name,
                    key = %partition_key,
                    error = %e,
                    "Transport submit failed"
                );
            })?;

        debug!(
            event = event_name,
            key = %partition_key,
            partition = ack.partition,
            offset = ack.offset,
            should_consume,
            "Submitted envelope"
        );
        Ok(DeliveryReceipt::Submitted {
            partition_key,
            partition: ack.partition,
            offset: ack.offset,
            should_consume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutover::AtomicCutover;
    use crate::transport::InMemoryTransport;

    fn adapter(percent: u8) -> DistributedAdapter {
        DistributedAdapter::new(
            Arc::new(InMemoryTransport::new(1)),
            PartitionKeyResolver::new(),
            Arc::new(AtomicCutover::default()),
        )
        .with_throttle_percent(percent)
    }

    #[test]
    fn test_throttle_bounds() {
        assert!(adapter(100).sampled());
        assert!(!adapter(0).sampled());
        assert_eq!(adapter(250).throttle_percent(), 100);
    }

    #[test]
    fn test_throttle_is_runtime_adjustable() {
        let adapter = adapter(100);
        adapter.set_throttle_percent(0);
        assert!(!adapter.sampled());
        adapter.set_throttle_percent(100);
        assert!(adapter.sampled());
    }

    #[test]
    fn test_partial_throttle_samples_some() {
        let adapter = adapter(50);
        let forwarded = (0..1_000).filter(|_| adapter.sampled()).count();
        assert!(forwarded > 300 && forwarded < 700, "forwarded {forwarded}");
    }
}
