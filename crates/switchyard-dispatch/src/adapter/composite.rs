use std::sync::Arc;

use async_trait::async_trait;
use switchyard_events::{Attributes, EventSchemaRegistry};
use tracing::warn;

use super::{DeliveryAdapter, DeliveryReceipt};
use crate::error::{AdapterFailure, PublishError, PublishResult};
use crate::pipeline::PublishPipeline;

/// Invokes several adapters in order.
///
/// Every member runs even if an earlier one failed. Failures are reported
/// together with the receipts of the members that succeeded.
#[derive(Debug, Clone)]
pub struct CompositeAdapter {
    adapters: Vec<Arc<dyn DeliveryAdapter>>,
}

impl CompositeAdapter {
    /// Create a composite over `adapters`, invoked in the given order.
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn DeliveryAdapter>>) -> Self {
        Self { adapters }
    }

    /// Member adapters in invocation order.
    #[must_use]
    pub fn adapters(&self) -> &[Arc<dyn DeliveryAdapter>] {
        &self.adapters
    }
}

#[async_trait]
impl DeliveryAdapter for CompositeAdapter {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn verify(&self, registry: &EventSchemaRegistry) -> PublishResult<()> {
        self.adapters
            .iter()
            .try_for_each(|adapter| adapter.verify(registry))
    }

    async fn deliver(
        &self,
        pipeline: &PublishPipeline,
        event_name: &str,
        attributes: &Attributes,
    ) -> PublishResult<DeliveryReceipt> {
        let mut receipts = Vec::with_capacity(self.adapters.len());
        let mut failures = Vec::new();

        for adapter in &self.adapters {
            match adapter.deliver(pipeline, event_name, attributes).await {
                Ok(receipt) => receipts.push(receipt),
                Err(error) => {
                    warn!(
                        event = event_name,
                        adapter = adapter.name(),
                        error = %error,
                        "Composite member failed; continuing"
                    );
                    failures.push(AdapterFailure {
                        adapter: adapter.name(),
                        error,
                    });
                },
            }
        }

        if failures.is_empty() {
            Ok(DeliveryReceipt::Composite(receipts))
        } else {
            Err(PublishError::Partial {
                attempted: self.adapters.len(),
                receipts,
                failures,
            })
        }
    }
}
