//! A config file drives adapter selection, partitioning, and worker settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use switchyard_config::{AdapterMode, GateMode, loader};
use switchyard_dispatch::{
    ConsumeGate, DeliveryReceipt, InMemoryTransport, PublishError, PublishPipeline, setup,
};
use switchyard_events::EventError;
use switchyard_test::{
    DispatchHarness, PROFILE_UPDATED, RecordingHandler, profile_attributes, test_registry,
    write_config_file,
};

const CONFIG: &str = r#"
[dispatch]
topic = "profiles"
adapter = "dual"
throttle_percent = 100

[cutover]
consume_enabled = true
gate = "live"

[consumer]
max_batch_size = 8
poll_timeout_ms = 25
liveness_deadline_ms = 2000
heartbeat_interval_ms = 500

[transport]
partitions = 2

[partitioning.keys]
profile_updated = ["account_id"]
"#;

#[tokio::test]
async fn test_file_config_builds_working_pipeline() {
    let (_dir, path) = write_config_file(CONFIG);
    let resolved = loader::load_with_env(Some(&path), &HashMap::new()).unwrap();
    let config = resolved.config;

    assert_eq!(config.dispatch.adapter, AdapterMode::Dual);
    assert_eq!(config.cutover.gate, GateMode::Live);

    let worker = setup::worker_config(&config);
    assert_eq!(worker.gate, ConsumeGate::Live);
    assert_eq!(worker.max_batch_size, 8);
    assert_eq!(worker.heartbeat_interval, Duration::from_millis(500));

    let harness = DispatchHarness::from_config(config);
    assert_eq!(harness.topic(), "profiles");
    let handler = RecordingHandler::new();
    harness.subscribe_profile(&handler);

    let first = harness
        .pipeline
        .publish(PROFILE_UPDATED, &profile_attributes(4, 1))
        .await
        .unwrap();
    let second = harness
        .pipeline
        .publish(PROFILE_UPDATED, &profile_attributes(4, 2))
        .await
        .unwrap();

    let partition_of = |receipt: &DeliveryReceipt| match receipt {
        DeliveryReceipt::Composite(members) => members.iter().find_map(|m| match m {
            DeliveryReceipt::Submitted { partition, .. } => Some(*partition),
            _ => None,
        }),
        _ => None,
    };
    assert!(partition_of(&first).is_some());
    assert_eq!(partition_of(&first), partition_of(&second));

    let summary = harness.drain().await;
    assert_eq!(summary.dispatched, 2);
    assert_eq!(handler.count(), 4);
}

#[test]
fn test_environment_fills_unset_fields_only() {
    let (_dir, path) = write_config_file("[dispatch]\nadapter = \"distributed\"\n");
    let env: HashMap<String, String> = [
        ("SWITCHYARD_ADAPTER", "inline"),
        ("SWITCHYARD_CONSUME_ENABLED", "true"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();

    let resolved = loader::load_with_env(Some(&path), &env).unwrap();

    assert_eq!(resolved.config.dispatch.adapter, AdapterMode::Distributed);
    assert!(resolved.config.cutover.consume_enabled);
}

#[test]
fn test_partition_key_outside_schema_fails_at_startup() {
    let keyed_on_tenant = CONFIG.replace("[\"account_id\"]", "[\"tenant_id\"]");
    let (_dir, path) = write_config_file(&keyed_on_tenant);
    let config = loader::load_with_env(Some(&path), &HashMap::new())
        .unwrap()
        .config;

    let transport = Arc::new(InMemoryTransport::new(config.transport.partitions));
    let delivery = setup::delivery(&config, transport, setup::cutover(&config));
    let topic = config.dispatch.topic.clone();
    let pipeline = PublishPipeline::new(topic, test_registry(), delivery.adapter);

    let err = pipeline.verify().unwrap_err();
    assert!(matches!(
        err,
        PublishError::Event(EventError::UndeclaredPartitionAttribute { ref event, ref attribute })
            if event == PROFILE_UPDATED && attribute == "tenant_id"
    ));
}
