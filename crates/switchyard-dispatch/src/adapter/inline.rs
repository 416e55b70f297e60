use async_trait::async_trait;
use switchyard_events::Attributes;

use super::{DeliveryAdapter, DeliveryReceipt};
use crate::error::PublishResult;
use crate::pipeline::PublishPipeline;

/// Runs every subscriber synchronously in the publisher's task.
///
/// The first handler failure stops delivery and is returned to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineAdapter;

impl InlineAdapter {
    /// Create the adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeliveryAdapter for InlineAdapter {
    fn name(&self) -> &'static str {
        "inline"
    }

    async fn deliver(
        &self,
        pipeline: &PublishPipeline,
        event_name: &str,
        attributes: &Attributes,
    ) -> PublishResult<DeliveryReceipt> {
        let handlers = pipeline.dispatch_locally(event_name, attributes)?;
        Ok(DeliveryReceipt::Inline { handlers })
    }
}
