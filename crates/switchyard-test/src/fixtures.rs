//! Test fixtures for common schemas and settings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use switchyard_config::{AdapterMode, Config};
use switchyard_dispatch::{ConsumeGate, WorkerConfig};
use switchyard_events::{Attributes, EventSchemaRegistry, attributes};
use tempfile::TempDir;

/// Event keyed on `account_id`.
pub const PROFILE_UPDATED: &str = "profile_updated";

/// Event partitioned over all its values.
pub const ORDER_PLACED: &str = "order_placed";

/// Required attributes of [`PROFILE_UPDATED`].
pub const PROFILE_PARAMS: [&str; 2] = ["account_id", "profile_id"];

/// Required attributes of [`ORDER_PLACED`].
pub const ORDER_PARAMS: [&str; 2] = ["order_id", "amount"];

/// A frozen registry holding [`PROFILE_UPDATED`] and [`ORDER_PLACED`].
///
/// # Panics
///
/// Never in practice; the two names are distinct.
#[must_use]
pub fn test_registry() -> Arc<EventSchemaRegistry> {
    let registry = EventSchemaRegistry::new();
    registry
        .register(PROFILE_UPDATED, PROFILE_PARAMS)
        .expect("fresh registry accepts profile_updated");
    registry
        .register(ORDER_PLACED, ORDER_PARAMS)
        .expect("fresh registry accepts order_placed");
    registry.freeze();
    Arc::new(registry)
}

/// Attributes for a [`PROFILE_UPDATED`] event.
#[must_use]
pub fn profile_attributes(account_id: i64, profile_id: i64) -> Attributes {
    attributes([("account_id", account_id), ("profile_id", profile_id)])
}

/// Attributes for an [`ORDER_PLACED`] event.
#[must_use]
pub fn order_attributes(order_id: i64, amount: i64) -> Attributes {
    attributes([("order_id", order_id), ("amount", amount)])
}

/// Configuration with short timings suited to tests.
///
/// Consumption is enabled, `profile_updated` is keyed on `account_id`, and
/// the transport has four partitions.
#[must_use]
pub fn test_config(mode: AdapterMode) -> Config {
    let mut config = Config::default();
    config.dispatch.adapter = mode;
    config.cutover.consume_enabled = true;
    config.consumer.max_batch_size = 16;
    config.consumer.poll_timeout_ms = 20;
    config.consumer.liveness_deadline_ms = 3_000;
    config.consumer.heartbeat_interval_ms = 1_000;
    config.transport.partitions = 4;
    config
        .partitioning
        .keys
        .insert(PROFILE_UPDATED.to_owned(), vec!["account_id".to_owned()]);
    config
}

/// Worker settings matching [`test_config`].
#[must_use]
pub fn test_worker_config() -> WorkerConfig {
    WorkerConfig {
        max_batch_size: 16,
        poll_timeout: Duration::from_millis(20),
        liveness_deadline: Duration::from_secs(3),
        heartbeat_interval: Duration::from_secs(1),
        gate: ConsumeGate::Stamped,
    }
}

/// Write `contents` to `switchyard.toml` in a fresh temporary directory.
///
/// Keep the returned [`TempDir`] alive for as long as the file is needed.
///
/// # Panics
///
/// If the temporary directory or file cannot be created.
#[must_use]
pub fn write_config_file(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("switchyard.toml");
    std::fs::write(&path, contents).expect("write config file");
    (dir, path)
}
