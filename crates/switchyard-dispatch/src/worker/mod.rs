//! Consumer-group worker.
//!
//! A worker polls batches from the transport and runs each record through
//! the same local dispatch path as inline delivery. It heartbeats between
//! records so that long batches never exceed the group's liveness deadline.

mod liveness;
mod pool;

pub use liveness::LivenessTracker;
pub use pool::{WorkerPool, spawn_workers};

use std::sync::Arc;
use std::time::Duration;

use switchyard_events::Envelope;
use switchyard_telemetry::Counter;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cutover::CutoverController;
use crate::pipeline::PublishPipeline;
use crate::transport::{Transport, TransportRecord};

/// Event name reported for payloads that could not be decoded.
const UNDECODABLE: &str = "unknown";

/// How a worker decides whether a received message is dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsumeGate {
    /// Use the flag stamped on the envelope at publish time.
    #[default]
    Stamped,
    /// Ask the cutover controller when the record is consumed.
    Live,
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Between poll cycles.
    Idle,
    /// Waiting on the transport.
    Polling,
    /// A non-empty batch arrived.
    BatchReceived,
    /// Running a record through local dispatch.
    Processing,
    /// Acknowledging a record.
    Acknowledging,
    /// Shut down; terminal.
    Stopped,
}

/// Batch and liveness settings for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum records pulled per poll.
    pub max_batch_size: usize,
    /// How long a poll waits for records.
    pub poll_timeout: Duration,
    /// Time without a heartbeat after which the group evicts the worker.
    pub liveness_deadline: Duration,
    /// Target spacing between heartbeats.
    pub heartbeat_interval: Duration,
    /// Consume gate semantics.
    pub gate: ConsumeGate,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            poll_timeout: Duration::from_secs(1),
            liveness_deadline: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            gate: ConsumeGate::Stamped,
        }
    }
}

/// What happened to one polled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records in the batch.
    pub received: usize,
    /// Records dispatched to subscribers without error.
    pub dispatched: usize,
    /// Records acknowledged without dispatch because the gate was closed.
    pub skipped: usize,
    /// Records whose dispatch returned a handler failure.
    pub failed: usize,
    /// Records that could not be decoded or validated.
    pub undecodable: usize,
    /// Acknowledgements the transport refused.
    pub ack_failures: usize,
    /// Heartbeats sent while processing the batch.
    pub heartbeats: usize,
    /// Records left unacknowledged because of shutdown.
    pub unprocessed: usize,
    /// Whether shutdown interrupted the batch.
    pub interrupted: bool,
}

/// Totals over a worker's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Non-empty batches processed.
    pub batches: usize,
    /// Records received.
    pub received: usize,
    /// Records dispatched.
    pub dispatched: usize,
    /// Records skipped by the gate.
    pub skipped: usize,
    /// Records whose dispatch failed.
    pub failed: usize,
    /// Records that could not be decoded or validated.
    pub undecodable: usize,
    /// Acknowledgements refused.
    pub ack_failures: usize,
    /// Heartbeats sent, including idle ones.
    pub heartbeats: usize,
    /// Polls that returned a transport error.
    pub poll_errors: usize,
}

impl WorkerSummary {
    fn absorb(&mut self, report: &BatchReport) {
        self.batches = self.batches.saturating_add(1);
        self.received = self.received.saturating_add(report.received);
        self.dispatched = self.dispatched.saturating_add(report.dispatched);
        self.skipped = self.skipped.saturating_add(report.skipped);
        self.failed = self.failed.saturating_add(report.failed);
        self.undecodable = self.undecodable.saturating_add(report.undecodable);
        self.ack_failures = self.ack_failures.saturating_add(report.ack_failures);
        self.heartbeats = self.heartbeats.saturating_add(report.heartbeats);
    }

    /// Combine summaries from several workers.
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        self.batches = self.batches.saturating_add(other.batches);
        self.received = self.received.saturating_add(other.received);
        self.dispatched = self.dispatched.saturating_add(other.dispatched);
        self.skipped = self.skipped.saturating_add(other.skipped);
        self.failed = self.failed.saturating_add(other.failed);
        self.undecodable = self.undecodable.saturating_add(other.undecodable);
        self.ack_failures = self.ack_failures.saturating_add(other.ack_failures);
        self.heartbeats = self.heartbeats.saturating_add(other.heartbeats);
        self.poll_errors = self.poll_errors.saturating_add(other.poll_errors);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Dispatched,
    Skipped,
    Failed,
    Undecodable,
}

/// Pulls batches from the transport and dispatches them locally.
#[derive(Debug)]
pub struct ConsumerGroupWorker {
    id: String,
    config: WorkerConfig,
    transport: Arc<dyn Transport>,
    pipeline: Arc<PublishPipeline>,
    cutover: Arc<dyn CutoverController>,
    liveness: LivenessTracker,
    state: watch::Sender<WorkerState>,
}

impl ConsumerGroupWorker {
    /// Create a worker with a random identifier.
    #[must_use]
    pub fn new(
        config: WorkerConfig,
        transport: Arc<dyn Transport>,
        pipeline: Arc<PublishPipeline>,
        cutover: Arc<dyn CutoverController>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            id: format!("worker-{}", uuid::Uuid::new_v4().simple()),
            liveness: LivenessTracker::new(config.heartbeat_interval, config.liveness_deadline),
            config,
            transport,
            pipeline,
            cutover,
            state,
        }
    }

    /// Override the worker identifier used in logs.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Worker identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Poll and process batches until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> WorkerSummary {
        info!(worker = %self.id, topic = self.pipeline.topic(), "Consumer worker started");
        let mut summary = WorkerSummary::default();

        while !shutdown.is_cancelled() {
            if self.liveness.is_due(Instant::now()) && self.heartbeat().await {
                summary.heartbeats = summary.heartbeats.saturating_add(1);
            }

            self.set_state(WorkerState::Polling);
            let polled = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                polled = self.transport.poll_batch(
                    self.pipeline.topic(),
                    self.config.max_batch_size,
                    self.config.poll_timeout,
                ) => polled,
            };

            match polled {
                Ok(records) if records.is_empty() => {
                    self.set_state(WorkerState::Idle);
                    if self.heartbeat().await {
                        summary.heartbeats = summary.heartbeats.saturating_add(1);
                    }
                },
                Ok(records) => {
                    let report = self.process_batch(records, &shutdown).await;
                    summary.absorb(&report);
                    if report.interrupted {
                        break;
                    }
                },
                Err(e) => {
                    warn!(worker = %self.id, error = %e, "Poll failed");
                    summary.poll_errors = summary.poll_errors.saturating_add(1);
                    self.set_state(WorkerState::Idle);
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(self.config.poll_timeout) => {},
                    }
                },
            }
        }

        self.set_state(WorkerState::Stopped);
        info!(
            worker = %self.id,
            batches = summary.batches,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            failed = summary.failed,
            "Consumer worker stopped"
        );
        summary
    }

    /// Process one batch, heartbeating between records as needed.
    ///
    /// Each record is acknowledged after it is handled, whatever the outcome.
    /// Cancellation is checked between records; the rest of the batch stays
    /// unacknowledged for redelivery.
    pub async fn process_batch(
        &mut self,
        records: Vec<TransportRecord>,
        shutdown: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport {
            received: records.len(),
            ..BatchReport::default()
        };
        self.set_state(WorkerState::BatchReceived);
        debug!(worker = %self.id, records = records.len(), "Batch received");

        for (index, record) in records.iter().enumerate() {
            if shutdown.is_cancelled() {
                report.interrupted = true;
                report.unprocessed = records.len().saturating_sub(index);
                info!(
                    worker = %self.id,
                    unprocessed = report.unprocessed,
                    "Shutdown requested; leaving rest of batch for redelivery"
                );
                break;
            }

            if self.liveness.is_due(Instant::now()) && self.heartbeat().await {
                report.heartbeats = report.heartbeats.saturating_add(1);
            }

            let started = Instant::now();
            self.set_state(WorkerState::Processing);
            match self.handle_record(record) {
                RecordOutcome::Dispatched => {
                    report.dispatched = report.dispatched.saturating_add(1);
                },
                RecordOutcome::Skipped => report.skipped = report.skipped.saturating_add(1),
                RecordOutcome::Failed => report.failed = report.failed.saturating_add(1),
                RecordOutcome::Undecodable => {
                    report.undecodable = report.undecodable.saturating_add(1);
                },
            }

            self.set_state(WorkerState::Acknowledging);
            if let Err(e) = self.transport.acknowledge(record).await {
                warn!(
                    worker = %self.id,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Acknowledge failed; record will be redelivered"
                );
                report.ack_failures = report.ack_failures.saturating_add(1);
            }
            self.liveness.observe(started.elapsed());
        }

        self.set_state(WorkerState::Idle);
        report
    }

    fn handle_record(&self, record: &TransportRecord) -> RecordOutcome {
        let metrics = self.pipeline.metrics();

        let envelope = match Envelope::decode(&record.payload, record.key) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    worker = %self.id,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Dropping undecodable record"
                );
                metrics.increment(Counter::DecodeFailed, UNDECODABLE);
                return RecordOutcome::Undecodable;
            },
        };
        let event = envelope.event_name();

        if !self.gate_open(&envelope) {
            debug!(worker = %self.id, event, "Consume gate closed; skipping");
            metrics.increment(Counter::Skipped, event);
            return RecordOutcome::Skipped;
        }

        if let Err(e) = self.pipeline.registry().validate(event, envelope.attributes()) {
            warn!(
                worker = %self.id,
                event,
                error = %e,
                "Dropping record that fails schema validation"
            );
            metrics.increment(Counter::DecodeFailed, event);
            return RecordOutcome::Undecodable;
        }

        match self.pipeline.dispatch_locally(event, envelope.attributes()) {
            Ok(handlers) => {
                debug!(worker = %self.id, event, handlers, "Dispatched");
                metrics.increment(Counter::Consumed, event);
                RecordOutcome::Dispatched
            },
            Err(e) => {
                warn!(
                    worker = %self.id,
                    event,
                    error = %e,
                    "Dispatch failed; continuing with batch"
                );
                metrics.increment(Counter::DispatchFailed, event);
                RecordOutcome::Failed
            },
        }
    }

    fn gate_open(&self, envelope: &Envelope) -> bool {
        match self.config.gate {
            ConsumeGate::Stamped => envelope.should_consume(),
            ConsumeGate::Live => self.cutover.is_consume_enabled(),
        }
    }

    /// Returns whether the heartbeat was accepted.
    async fn heartbeat(&mut self) -> bool {
        match self.transport.heartbeat().await {
            Ok(()) => {
                self.liveness.beat(Instant::now());
                true
            },
            Err(e) => {
                let since_last = self.liveness.since_last(Instant::now());
                warn!(
                    worker = %self.id,
                    since_last_ms = u64::try_from(since_last.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Heartbeat failed"
                );
                false
            },
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }
}
