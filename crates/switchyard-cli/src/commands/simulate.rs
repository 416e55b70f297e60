//! Simulate command: drive the dispatch core over the in-memory transport.
//!
//! Publishes synthetic `profile_updated` events through the configured
//! adapter, runs the consumer group until every record is acknowledged, and
//! prints the counters.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use switchyard_config::{AdapterMode, Config};
use switchyard_dispatch::{
    ConsumerGroupWorker, HandlerError, InMemoryTransport, PublishPipeline,
    Subscriber, WorkerSummary, setup, spawn_workers,
};
use switchyard_events::{Attributes, EventSchemaRegistry, attributes};
use switchyard_telemetry::{Counter, InMemoryMetrics};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::theme::Theme;

const EVENT: &str = "profile_updated";

/// Upper bound on waiting for the consumer group to catch up.
const DRAIN_LIMIT: Duration = Duration::from_secs(30);

/// Knobs for one simulation run.
#[derive(Debug, Clone)]
pub(crate) struct SimulateOptions {
    /// Events to publish.
    pub(crate) events: usize,
    /// Distinct accounts the events are spread over.
    pub(crate) accounts: u32,
    /// Override `[dispatch] adapter`.
    pub(crate) adapter: Option<AdapterMode>,
    /// Override `[cutover] consume_enabled`.
    pub(crate) consume: Option<bool>,
    /// Make the handler fail for every n-th profile id.
    pub(crate) fail_every: Option<usize>,
}

/// What a simulation run produced.
#[derive(Debug, Clone)]
pub(crate) struct SimulationReport {
    pub(crate) adapter: AdapterMode,
    pub(crate) published: usize,
    pub(crate) publish_errors: usize,
    pub(crate) handled: usize,
    pub(crate) consumers: WorkerSummary,
    pub(crate) workers: usize,
    pub(crate) counters: BTreeMap<(Counter, String), u64>,
    pub(crate) uncommitted: u64,
    pub(crate) elapsed: Duration,
}

/// Run a simulation and print its report.
pub(crate) async fn simulate(config: &Config, options: &SimulateOptions) -> Result<()> {
    println!("{}", Theme::header("Switchyard simulation"));
    println!("{}", Theme::separator());
    let report = run_simulation(config, options).await?;
    print_report(&report);
    if report.uncommitted > 0 {
        println!(
            "{}",
            Theme::warning(&format!(
                "{} records were still unacknowledged when the run stopped",
                report.uncommitted
            ))
        );
    }
    Ok(())
}

pub(crate) async fn run_simulation(
    config: &Config,
    options: &SimulateOptions,
) -> Result<SimulationReport> {
    let started = Instant::now();
    let mut config = config.clone();
    if let Some(adapter) = options.adapter {
        config.dispatch.adapter = adapter;
    }

    let registry = EventSchemaRegistry::new();
    registry
        .register(EVENT, ["account_id", "profile_id"])
        .context("failed to register simulation schema")?;
    registry.freeze();

    let transport = Arc::new(InMemoryTransport::new(config.transport.partitions));
    let cutover = setup::cutover(&config);
    if let Some(consume) = options.consume {
        cutover.set_consume_enabled(consume);
    }
    let metrics = Arc::new(InMemoryMetrics::new());
    let delivery = setup::delivery(&config, Arc::clone(&transport) as Arc<_>, Arc::clone(&cutover));
    let pipeline = Arc::new(
        PublishPipeline::new(config.dispatch.topic.clone(), Arc::new(registry), delivery.adapter)
            .with_metrics(Arc::clone(&metrics) as Arc<_>),
    );
    pipeline
        .verify()
        .context("delivery settings do not match the simulation schema")?;

    let handled = Arc::new(AtomicUsize::new(0));
    pipeline.subscribe(EVENT, counting_subscriber(Arc::clone(&handled), options.fail_every))?;

    let workers = if config.dispatch.adapter == AdapterMode::Inline {
        0
    } else {
        config.consumer.workers
    };
    let worker_config = setup::worker_config(&config);
    let pool = spawn_workers(workers, CancellationToken::new(), |index| {
        ConsumerGroupWorker::new(
            worker_config.clone(),
            Arc::new(transport.assign(owned_partitions(index, workers, transport.partitions()))),
            Arc::clone(&pipeline),
            Arc::clone(&cutover),
        )
        .with_id(format!("sim-{index}"))
    });

    info!(
        events = options.events,
        accounts = options.accounts,
        adapter = %config.dispatch.adapter,
        consume = cutover.is_consume_enabled(),
        workers,
        "Simulation started"
    );

    let accounts = u64::from(options.accounts.max(1));
    let mut published: usize = 0;
    let mut publish_errors: usize = 0;
    for (sequence, account) in (0u64..).zip((0..accounts).cycle()).take(options.events) {
        let attrs = attributes([("account_id", account), ("profile_id", sequence)]);
        match pipeline.publish(EVENT, &attrs).await {
            Ok(_) => published = published.saturating_add(1),
            Err(e) => {
                warn!(sequence, error = %e, "Publish failed");
                publish_errors = publish_errors.saturating_add(1);
            },
        }
    }

    let topic = config.dispatch.topic.clone();
    if !pool.is_empty() {
        let caught_up = tokio::time::timeout(DRAIN_LIMIT, async {
            while transport.uncommitted(&topic) > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if caught_up.is_err() {
            warn!(limit_secs = DRAIN_LIMIT.as_secs(), "Consumers did not catch up in time");
        }
    }

    let consumers = pool
        .shutdown()
        .await
        .iter()
        .fold(WorkerSummary::default(), |acc, summary| acc.merge(summary));

    Ok(SimulationReport {
        adapter: config.dispatch.adapter,
        published,
        publish_errors,
        handled: handled.load(Ordering::SeqCst),
        consumers,
        workers,
        counters: metrics.snapshot(),
        uncommitted: transport.uncommitted(&topic),
        elapsed: started.elapsed(),
    })
}

fn counting_subscriber(handled: Arc<AtomicUsize>, fail_every: Option<usize>) -> Subscriber {
    Subscriber::new("simulation-audit", ["account_id", "profile_id"], move |attrs: &Attributes| {
        let profile = attrs
            .get("profile_id")
            .and_then(serde_json::Value::as_u64)
            .and_then(|id| usize::try_from(id).ok())
            .unwrap_or_default();
        if let Some(every) = fail_every
            && profile.checked_rem(every) == Some(0)
        {
            return Err(HandlerError::new(format!("simulated failure for profile {profile}")));
        }
        handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// Partitions `index, index + workers, ...` below `partitions`.
fn owned_partitions(index: usize, workers: usize, partitions: u32) -> Vec<u32> {
    (0..partitions)
        .filter(|p| {
            usize::try_from(*p)
                .ok()
                .and_then(|p| p.checked_rem(workers))
                == Some(index)
        })
        .collect()
}

fn print_report(report: &SimulationReport) {
    println!("{}", Theme::kv("adapter", &Theme::adapter(report.adapter)));
    println!("{}", Theme::kv("workers", &report.workers.to_string()));
    println!("{}", Theme::kv("published", &report.published.to_string()));
    if report.publish_errors > 0 {
        println!("{}", Theme::kv("publish errors", &report.publish_errors.to_string()));
    }
    println!("{}", Theme::kv("handled", &report.handled.to_string()));
    println!("{}", Theme::kv("batches", &report.consumers.batches.to_string()));
    println!("{}", Theme::kv("heartbeats", &report.consumers.heartbeats.to_string()));
    println!(
        "{}",
        Theme::kv("elapsed", &format!("{:.1?}", report.elapsed))
    );

    println!();
    println!("{}", Theme::header("Counters"));
    for ((counter, event), value) in &report.counters {
        println!("{}", Theme::kv(&format!("{counter} ({event})"), &value.to_string()));
    }
    if report.uncommitted == 0 {
        println!("{}", Theme::success("All submitted records acknowledged"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.consumer.poll_timeout_ms = 10;
        config.consumer.workers = 2;
        config.transport.partitions = 4;
        config
    }

    fn sim_options(events: usize) -> SimulateOptions {
        SimulateOptions {
            events,
            accounts: 10,
            adapter: None,
            consume: None,
            fail_every: None,
        }
    }

    #[tokio::test]
    async fn test_inline_simulation() {
        let options = sim_options(20);
        let report = run_simulation(&fast_config(), &options).await.unwrap();
        assert_eq!(report.published, 20);
        assert_eq!(report.handled, 20);
        assert_eq!(report.workers, 0);
        assert_eq!(report.counters.get(&(Counter::Published, EVENT.to_owned())), Some(&20));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dual_simulation_consumes_everything() {
        let options = SimulateOptions {
            events: 30,
            accounts: 5,
            adapter: Some(AdapterMode::Dual),
            consume: Some(true),
            fail_every: None,
        };
        let report = run_simulation(&fast_config(), &options).await.unwrap();
        assert_eq!(report.published, 30);
        assert_eq!(report.consumers.dispatched, 30);
        assert_eq!(report.handled, 60);
        assert_eq!(report.uncommitted, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distributed_simulation_with_consume_off() {
        let options = SimulateOptions {
            adapter: Some(AdapterMode::Distributed),
            consume: Some(false),
            ..sim_options(10)
        };
        let report = run_simulation(&fast_config(), &options).await.unwrap();
        assert_eq!(report.handled, 0);
        assert_eq!(report.consumers.skipped, 10);
        assert_eq!(report.uncommitted, 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let options = SimulateOptions {
            fail_every: Some(5),
            ..sim_options(10)
        };
        let report = run_simulation(&fast_config(), &options).await.unwrap();
        // Profiles 0 and 5 fail inline and surface as publish errors.
        assert_eq!(report.publish_errors, 2);
        assert_eq!(report.published, 8);
        assert_eq!(report.handled, 8);
    }

    #[test]
    fn test_owned_partitions_split_evenly() {
        assert_eq!(owned_partitions(0, 2, 5), vec![0, 2, 4]);
        assert_eq!(owned_partitions(1, 2, 5), vec![1, 3]);
        assert_eq!(owned_partitions(0, 1, 3), vec![0, 1, 2]);
    }
}
