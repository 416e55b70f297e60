//! Shared helpers for integration tests.

use std::sync::Arc;

use switchyard_dispatch::{
    ConsumerGroupWorker, InMemoryTransport, PublishPipeline, WorkerPool, spawn_workers,
};
use switchyard_events::Attributes;
use switchyard_test::{DispatchHarness, PROFILE_UPDATED, profile_attributes, test_worker_config};
use tokio_util::sync::CancellationToken;

/// Publish `profile_updated` for each `(account, profile)` pair, in order.
#[allow(dead_code)]
pub async fn publish_profiles(harness: &DispatchHarness, pairs: &[(i64, i64)]) {
    for (account, profile) in pairs {
        harness
            .pipeline
            .publish(PROFILE_UPDATED, &profile_attributes(*account, *profile))
            .await
            .expect("publish succeeds");
    }
}

/// Spawn `count` workers, each owning the partitions `i, i + count, ...`.
#[allow(dead_code)]
pub fn spawn_partitioned(
    count: usize,
    transport: &Arc<InMemoryTransport>,
    pipeline: &Arc<PublishPipeline>,
    shutdown: CancellationToken,
) -> WorkerPool {
    let partitions = transport.partitions();
    spawn_workers(count, shutdown, |index| {
        let owned: Vec<u32> = (0..partitions)
            .filter(|p| usize::try_from(*p).is_ok_and(|p| p.checked_rem(count) == Some(index)))
            .collect();
        ConsumerGroupWorker::new(
            test_worker_config(),
            Arc::new(transport.assign(owned)),
            Arc::clone(pipeline),
            Arc::new(switchyard_dispatch::AtomicCutover::new(true)),
        )
        .with_id(format!("worker-{index}"))
    })
}

/// Wait until nothing on `topic` is left unacknowledged.
#[allow(dead_code)]
pub async fn wait_until_committed(transport: &InMemoryTransport, topic: &str) {
    tokio::time::timeout(std::time::Duration::from_secs(10), async {
        while transport.uncommitted(topic) > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("all records acknowledged in time");
}

/// Sort attribute maps so that delivery order does not matter in comparisons.
#[allow(dead_code)]
pub fn sorted(mut calls: Vec<Attributes>) -> Vec<Attributes> {
    calls.sort_by_key(|attrs| serde_json::to_string(attrs).unwrap_or_default());
    calls
}
