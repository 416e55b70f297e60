//! A pipeline wired the way the service wires it, over an in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use switchyard_config::{AdapterMode, Config};
use switchyard_dispatch::setup;
use switchyard_dispatch::{
    ConsumerGroupWorker, CutoverController, DistributedAdapter, PublishPipeline, WorkerSummary,
};
use switchyard_events::EventSchemaRegistry;
use switchyard_telemetry::InMemoryMetrics;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::fixtures::{PROFILE_PARAMS, PROFILE_UPDATED, test_config, test_registry};
use crate::mocks::RecordingTransport;

/// Upper bound on how long [`DispatchHarness::drain`] waits.
const DRAIN_LIMIT: Duration = Duration::from_secs(10);

/// Everything a dispatch test needs, built from one [`Config`].
#[derive(Debug)]
pub struct DispatchHarness {
    /// Configuration the harness was built from.
    pub config: Config,
    /// Frozen registry from [`test_registry`].
    pub registry: Arc<EventSchemaRegistry>,
    /// Recording wrapper around the in-memory transport.
    pub transport: RecordingTransport,
    /// Cutover flag shared by publishers and workers.
    pub cutover: Arc<dyn CutoverController>,
    /// Counters reported by the pipeline and workers.
    pub metrics: Arc<InMemoryMetrics>,
    /// The pipeline under test.
    pub pipeline: Arc<PublishPipeline>,
    /// The distributed adapter, when the mode has one.
    pub distributed: Option<Arc<DistributedAdapter>>,
}

impl DispatchHarness {
    /// Harness over [`test_config`] in the given adapter mode.
    #[must_use]
    pub fn new(mode: AdapterMode) -> Self {
        Self::from_config(test_config(mode))
    }

    /// Harness over an explicit configuration.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self::with_transport(config.clone(), RecordingTransport::new(config.transport.partitions))
    }

    /// Harness over an explicit configuration and transport.
    ///
    /// # Panics
    ///
    /// If the configured partition keys do not match [`test_registry`].
    #[must_use]
    pub fn with_transport(config: Config, transport: RecordingTransport) -> Self {
        let registry = test_registry();
        let cutover = setup::cutover(&config);
        let metrics = Arc::new(InMemoryMetrics::new());
        let delivery = setup::delivery(&config, Arc::new(transport.clone()), Arc::clone(&cutover));
        let pipeline = PublishPipeline::new(
            config.dispatch.topic.clone(),
            Arc::clone(&registry),
            delivery.adapter,
        )
        .with_metrics(metrics.clone());
        pipeline
            .verify()
            .expect("configured partition keys match the test registry");

        Self {
            config,
            registry,
            transport,
            cutover,
            metrics,
            pipeline: Arc::new(pipeline),
            distributed: delivery.distributed,
        }
    }

    /// Topic the pipeline publishes to.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.pipeline.topic()
    }

    /// Subscribe a recording handler to `profile_updated`.
    ///
    /// # Panics
    ///
    /// If the registry rejects the subscription, which the fixtures rule out.
    pub fn subscribe_profile(&self, handler: &crate::mocks::RecordingHandler) {
        self.pipeline
            .subscribe(PROFILE_UPDATED, handler.subscriber("recorder", PROFILE_PARAMS))
            .expect("profile subscriber matches the schema");
    }

    /// A worker over the whole transport using the configured settings.
    #[must_use]
    pub fn worker(&self) -> ConsumerGroupWorker {
        ConsumerGroupWorker::new(
            setup::worker_config(&self.config),
            Arc::new(self.transport.clone()),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.cutover),
        )
    }

    /// Run one worker until every submitted record is acknowledged, then stop it.
    ///
    /// # Panics
    ///
    /// If the worker task panics.
    pub async fn drain(&self) -> WorkerSummary {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.worker().run(shutdown.clone()));

        let topic = self.topic().to_owned();
        let inner = Arc::clone(self.transport.inner());
        let _ = tokio::time::timeout(DRAIN_LIMIT, async move {
            while inner.uncommitted(&topic) > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;

        shutdown.cancel();
        task.await.expect("worker task completes")
    }
}

/// Install a test-friendly `tracing` subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
