//! Publish pipeline.
//!
//! Every publish is validated against the schema registry and then handed to
//! the configured [`DeliveryAdapter`]. Subscriptions and the adapter are held
//! in copy-on-write snapshots so publishers never take a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use switchyard_events::{Attributes, EventSchemaRegistry};
use switchyard_telemetry::{Counter, MetricsSink, NoopMetrics};
use tracing::{debug, info, warn};

use crate::adapter::{DeliveryAdapter, DeliveryReceipt};
use crate::error::{PublishError, PublishResult};
use crate::subscriber::Subscriber;

type Subscriptions = HashMap<String, Vec<Arc<Subscriber>>>;

/// Validates, routes, and locally dispatches events for one topic.
#[derive(Debug)]
pub struct PublishPipeline {
    topic: String,
    registry: Arc<EventSchemaRegistry>,
    subscriptions: ArcSwap<Subscriptions>,
    /// Serializes subscription writers; readers go through the snapshot.
    writer: Mutex<()>,
    adapter: ArcSwap<Arc<dyn DeliveryAdapter>>,
    metrics: Arc<dyn MetricsSink>,
}

impl PublishPipeline {
    /// Create a pipeline publishing to `topic` through `adapter`.
    #[must_use]
    pub fn new(
        topic: impl Into<String>,
        registry: Arc<EventSchemaRegistry>,
        adapter: Arc<dyn DeliveryAdapter>,
    ) -> Self {
        Self {
            topic: topic.into(),
            registry,
            subscriptions: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
            adapter: ArcSwap::from_pointee(adapter),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Report counters to `metrics` instead of discarding them.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Topic used by the distributed path.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Schema registry publishes are validated against.
    #[must_use]
    pub fn registry(&self) -> &Arc<EventSchemaRegistry> {
        &self.registry
    }

    /// Counter sink.
    #[must_use]
    pub fn metrics(&self) -> &Arc<dyn MetricsSink> {
        &self.metrics
    }

    /// The adapter currently in use.
    #[must_use]
    pub fn adapter(&self) -> Arc<dyn DeliveryAdapter> {
        Arc::clone(&**self.adapter.load())
    }

    /// Replace the delivery adapter. Publishes already in flight finish on
    /// the adapter they started with.
    pub fn set_adapter(&self, adapter: Arc<dyn DeliveryAdapter>) {
        let name = adapter.name();
        let previous = self.adapter.swap(Arc::new(adapter));
        info!(from = previous.name(), to = name, "Delivery adapter swapped");
    }

    /// Check the current adapter's settings against the registry.
    ///
    /// Call once after wiring, before the first publish.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Event`] when the adapter is configured for an
    /// unknown event or a key attribute the schema does not declare.
    pub fn verify(&self) -> PublishResult<()> {
        let adapter = self.adapter();
        adapter.verify(&self.registry).inspect_err(|e| {
            warn!(
                topic = %self.topic,
                adapter = adapter.name(),
                error = %e,
                "Pipeline configuration rejected"
            );
        })
    }

    /// Validate and deliver an event.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Event`] for an unknown event or attribute
    /// mismatch (the adapter is not invoked), or whatever the adapter
    /// reports.
    pub async fn publish(
        &self,
        event_name: &str,
        attributes: &Attributes,
    ) -> PublishResult<DeliveryReceipt> {
        self.registry.validate(event_name, attributes).inspect_err(|e| {
            debug!(event = event_name, error = %e, "Publish rejected by schema");
        })?;

        let adapter = self.adapter();
        let receipt = adapter.deliver(self, event_name, attributes).await?;
        self.metrics.increment(Counter::Published, event_name);
        debug!(event = event_name, adapter = adapter.name(), "Published");
        Ok(receipt)
    }

    /// Register a subscriber for `event_name`.
    ///
    /// The declared parameters must equal the event's required attributes.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Event`] for an unknown event and
    /// [`PublishError::InvalidSubscriber`] when the parameters differ.
    pub fn subscribe(&self, event_name: &str, subscriber: Subscriber) -> PublishResult<()> {
        let definition = self.registry.lookup(event_name)?;
        let diff = subscriber.diff(&definition);
        if !diff.is_exact() {
            warn!(
                event = event_name,
                subscriber = subscriber.name(),
                missing = ?diff.missing,
                unexpected = ?diff.unexpected,
                "Rejected subscriber with mismatched parameters"
            );
            return Err(PublishError::InvalidSubscriber {
                event: event_name.to_owned(),
                subscriber: subscriber.name().to_owned(),
                missing: diff.missing,
                unexpected: diff.unexpected,
            });
        }

        let _guard = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut next = Subscriptions::clone(&self.subscriptions.load());
        debug!(event = event_name, subscriber = subscriber.name(), "Subscribed");
        next.entry(event_name.to_owned())
            .or_default()
            .push(Arc::new(subscriber));
        self.subscriptions.store(Arc::new(next));
        Ok(())
    }

    /// Number of subscribers registered for `event_name`.
    #[must_use]
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.subscriptions.load().get(event_name).map_or(0, Vec::len)
    }

    /// Invoke every subscriber of `event_name` in registration order.
    ///
    /// This is the only dispatch path: inline delivery and consumer workers
    /// both end here. Attributes are assumed to be validated already.
    ///
    /// Returns the number of handlers invoked.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Dispatch`] for the first failing handler; the
    /// remaining handlers are not invoked.
    pub fn dispatch_locally(
        &self,
        event_name: &str,
        attributes: &Attributes,
    ) -> PublishResult<usize> {
        let snapshot = self.subscriptions.load();
        let Some(subscribers) = snapshot.get(event_name) else {
            return Ok(0);
        };

        for subscriber in subscribers {
            subscriber.handle(attributes).map_err(|source| {
                warn!(
                    event = event_name,
                    subscriber = subscriber.name(),
                    error = %source,
                    "Subscriber failed"
                );
                PublishError::Dispatch {
                    event: event_name.to_owned(),
                    subscriber: subscriber.name().to_owned(),
                    source,
                }
            })?;
        }
        Ok(subscribers.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use switchyard_events::{EventError, PartitionKeyResolver, attributes};
    use switchyard_telemetry::InMemoryMetrics;

    use super::*;
    use crate::adapter::{CompositeAdapter, DistributedAdapter, InlineAdapter};
    use crate::cutover::{AtomicCutover, CutoverController};
    use crate::error::{HandlerError, TransportError};
    use crate::transport::InMemoryTransport;

    fn registry() -> Arc<EventSchemaRegistry> {
        let registry = EventSchemaRegistry::new();
        registry
            .register("profile_updated", ["account_id", "profile_id"])
            .unwrap();
        registry.register("ping", Vec::<String>::new()).unwrap();
        registry.freeze();
        Arc::new(registry)
    }

    fn inline_pipeline() -> PublishPipeline {
        PublishPipeline::new("events", registry(), Arc::new(InlineAdapter::new()))
    }

    fn profile() -> Attributes {
        attributes([("account_id", 1), ("profile_id", 2)])
    }

    fn recorder(log: &Arc<StdMutex<Vec<String>>>, tag: &str) -> Subscriber {
        let log = Arc::clone(log);
        let tag = tag.to_owned();
        Subscriber::new(tag.clone(), ["account_id", "profile_id"], move |attrs: &Attributes| {
            log.lock().unwrap().push(format!("{tag}:{}", attrs["profile_id"]));
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_inline_runs_subscribers_in_order() {
        let pipeline = inline_pipeline();
        let log = Arc::new(StdMutex::new(Vec::new()));
        pipeline.subscribe("profile_updated", recorder(&log, "h1")).unwrap();
        pipeline.subscribe("profile_updated", recorder(&log, "h2")).unwrap();

        let receipt = pipeline.publish("profile_updated", &profile()).await.unwrap();

        assert_eq!(receipt, DeliveryReceipt::Inline { handlers: 2 });
        assert_eq!(*log.lock().unwrap(), vec!["h1:2", "h2:2"]);
    }

    #[tokio::test]
    async fn test_schema_mismatch_skips_adapter() {
        let pipeline = inline_pipeline();
        let log = Arc::new(StdMutex::new(Vec::new()));
        pipeline.subscribe("profile_updated", recorder(&log, "h1")).unwrap();

        let err = pipeline
            .publish("profile_updated", &attributes([("account_id", 1)]))
            .await
            .unwrap_err();

        assert!(err.is_schema_mismatch());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_event_rejected() {
        let err = inline_pipeline()
            .publish("nope", &Attributes::new())
            .await
            .unwrap_err();
        assert!(err.is_unknown_event());
    }

    #[tokio::test]
    async fn test_first_handler_failure_stops_inline_delivery() {
        let pipeline = inline_pipeline();
        let log = Arc::new(StdMutex::new(Vec::new()));
        pipeline
            .subscribe(
                "profile_updated",
                Subscriber::new("boom", ["account_id", "profile_id"], |_: &Attributes| {
                    Err(HandlerError::new("exploded"))
                }),
            )
            .unwrap();
        pipeline.subscribe("profile_updated", recorder(&log, "after")).unwrap();

        let err = pipeline.publish("profile_updated", &profile()).await.unwrap_err();
        match err {
            PublishError::Dispatch { subscriber, source, .. } => {
                assert_eq!(subscriber, "boom");
                assert_eq!(source.message(), "exploded");
            },
            other => panic!("unexpected error {other:?}"),
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subscribe_validates_parameters() {
        let pipeline = inline_pipeline();
        let err = pipeline
            .subscribe(
                "profile_updated",
                Subscriber::new("partial", ["account_id"], |_: &Attributes| Ok(())),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::InvalidSubscriber { ref missing, .. }
                if missing == &vec!["profile_id".to_owned()]
        ));

        let nothing = Subscriber::new("s", Vec::<String>::new(), |_: &Attributes| Ok(()));
        let err = pipeline.subscribe("missing", nothing).unwrap_err();
        assert!(matches!(err, PublishError::Event(EventError::UnknownEvent { .. })));
        assert_eq!(pipeline.subscriber_count("profile_updated"), 0);
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        assert_eq!(inline_pipeline().dispatch_locally("ping", &Attributes::new()).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_distributed_stamps_flag_and_skips_local() {
        let transport = Arc::new(InMemoryTransport::new(4));
        let cutover = Arc::new(AtomicCutover::new(false));
        let metrics = Arc::new(InMemoryMetrics::new());
        let pipeline = PublishPipeline::new(
            "events",
            registry(),
            Arc::new(DistributedAdapter::new(
                transport.clone(),
                PartitionKeyResolver::new().with_key_attributes("profile_updated", ["account_id"]),
                cutover.clone(),
            )),
        )
        .with_metrics(metrics.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        pipeline.subscribe("profile_updated", recorder(&log, "h1")).unwrap();

        let first = pipeline.publish("profile_updated", &profile()).await.unwrap();
        cutover.set_consume_enabled(true);
        let second = pipeline.publish("profile_updated", &profile()).await.unwrap();

        let DeliveryReceipt::Submitted {
            should_consume: first_flag,
            partition_key: first_key,
            ..
        } = first
        else {
            panic!("expected the first publish to be submitted");
        };
        let DeliveryReceipt::Submitted {
            should_consume: second_flag,
            partition_key: second_key,
            ..
        } = second
        else {
            panic!("expected the second publish to be submitted");
        };
        assert!(!first_flag);
        assert!(second_flag);
        assert_eq!(first_key, second_key);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(transport.submitted("events"), 2);
        assert_eq!(metrics.get(Counter::Published, "profile_updated"), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let transport = Arc::new(InMemoryTransport::new(1));
        transport.set_fail_submits(true);
        let pipeline = PublishPipeline::new(
            "events",
            registry(),
            Arc::new(DistributedAdapter::new(
                transport,
                PartitionKeyResolver::new(),
                Arc::new(AtomicCutover::default()),
            )),
        );
        let err = pipeline.publish("ping", &Attributes::new()).await.unwrap_err();
        assert!(matches!(err, PublishError::Delivery(TransportError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_composite_attempts_every_member() {
        let transport = Arc::new(InMemoryTransport::new(1));
        transport.set_fail_submits(true);
        let distributed: Arc<dyn DeliveryAdapter> = Arc::new(DistributedAdapter::new(
            transport,
            PartitionKeyResolver::new(),
            Arc::new(AtomicCutover::default()),
        ));
        let composite = CompositeAdapter::new(vec![distributed, Arc::new(InlineAdapter::new())]);
        let pipeline = PublishPipeline::new("events", registry(), Arc::new(composite));
        let log = Arc::new(StdMutex::new(Vec::new()));
        pipeline.subscribe("profile_updated", recorder(&log, "h1")).unwrap();

        let err = pipeline.publish("profile_updated", &profile()).await.unwrap_err();

        let PublishError::Partial { attempted, receipts, failures } = err else {
            panic!("expected partial failure");
        };
        assert_eq!(attempted, 2);
        assert_eq!(receipts, vec![DeliveryReceipt::Inline { handlers: 1 }]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].adapter, "distributed");
        assert_eq!(*log.lock().unwrap(), vec!["h1:2"]);
    }

    #[tokio::test]
    async fn test_throttled_publish_counts() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let transport = Arc::new(InMemoryTransport::new(1));
        let pipeline = PublishPipeline::new(
            "events",
            registry(),
            Arc::new(
                DistributedAdapter::new(
                    transport.clone(),
                    PartitionKeyResolver::new(),
                    Arc::new(AtomicCutover::default()),
                )
                .with_throttle_percent(0),
            ),
        )
        .with_metrics(metrics.clone());

        let receipt = pipeline.publish("ping", &Attributes::new()).await.unwrap();
        assert_eq!(receipt, DeliveryReceipt::Throttled);
        assert_eq!(transport.submitted("events"), 0);
        assert_eq!(metrics.get(Counter::Throttled, "ping"), 1);
    }

    #[tokio::test]
    async fn test_set_adapter_switches_path() {
        let transport = Arc::new(InMemoryTransport::new(1));
        let pipeline = inline_pipeline();
        assert_eq!(pipeline.adapter().name(), "inline");

        pipeline.set_adapter(Arc::new(DistributedAdapter::new(
            transport.clone(),
            PartitionKeyResolver::new(),
            Arc::new(AtomicCutover::default()),
        )));
        pipeline.publish("ping", &Attributes::new()).await.unwrap();

        assert_eq!(pipeline.adapter().name(), "distributed");
        assert_eq!(transport.submitted("events"), 1);
    }

    #[test]
    fn test_concurrent_subscribe() {
        let pipeline = Arc::new(inline_pipeline());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let pipeline = Arc::clone(&pipeline);
                std::thread::spawn(move || {
                    let subscriber =
                        Subscriber::new(format!("s{n}"), Vec::<String>::new(), |_: &Attributes| {
                            Ok(())
                        });
                    pipeline.subscribe("ping", subscriber).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(pipeline.subscriber_count("ping"), 8);
    }

    fn keyed_on(attribute: &str) -> Arc<dyn DeliveryAdapter> {
        let distributed: Arc<dyn DeliveryAdapter> = Arc::new(DistributedAdapter::new(
            Arc::new(InMemoryTransport::new(2)),
            PartitionKeyResolver::new().with_key_attributes("profile_updated", [attribute]),
            Arc::new(AtomicCutover::new(true)),
        ));
        Arc::new(CompositeAdapter::new(vec![
            Arc::new(InlineAdapter::new()),
            distributed,
        ]))
    }

    #[test]
    fn test_verify_rejects_undeclared_partition_attribute() {
        let pipeline = PublishPipeline::new("events", registry(), keyed_on("tenant_id"));
        let err = pipeline.verify().unwrap_err();
        assert!(matches!(
            err,
            PublishError::Event(EventError::UndeclaredPartitionAttribute { ref attribute, .. })
                if attribute == "tenant_id"
        ));

        pipeline.set_adapter(keyed_on("account_id"));
        assert!(pipeline.verify().is_ok());
        assert!(inline_pipeline().verify().is_ok());
    }
}
