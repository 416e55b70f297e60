//! The consume flag is frozen at publish time and gates consumers.

mod common;

use switchyard_config::{AdapterMode, CutoverSource, GateMode};
use switchyard_dispatch::DeliveryReceipt;
use switchyard_telemetry::Counter;
use switchyard_test::{
    DispatchHarness, PROFILE_UPDATED, RecordingHandler, profile_attributes, test_config,
};

#[tokio::test]
async fn test_disabled_flag_skips_and_acknowledges() {
    let harness = DispatchHarness::new(AdapterMode::Distributed);
    harness.cutover.set_consume_enabled(false);
    let handler = RecordingHandler::new();
    harness.subscribe_profile(&handler);

    common::publish_profiles(&harness, &[(1, 1), (2, 2)]).await;
    let summary = harness.drain().await;

    assert_eq!(summary.skipped, 2);
    assert_eq!(handler.count(), 0);
    assert_eq!(harness.transport.inner().uncommitted(harness.topic()), 0);
    assert_eq!(harness.metrics.total(Counter::Skipped), 2);
}

#[tokio::test]
async fn test_flag_change_only_affects_later_publishes() {
    let harness = DispatchHarness::new(AdapterMode::Distributed);
    harness.cutover.set_consume_enabled(false);
    let handler = RecordingHandler::new();
    harness.subscribe_profile(&handler);

    let before = harness
        .pipeline
        .publish(PROFILE_UPDATED, &profile_attributes(1, 1))
        .await
        .unwrap();
    harness.cutover.set_consume_enabled(true);
    let after = harness
        .pipeline
        .publish(PROFILE_UPDATED, &profile_attributes(1, 2))
        .await
        .unwrap();

    assert!(matches!(before, DeliveryReceipt::Submitted { should_consume: false, .. }));
    assert!(matches!(after, DeliveryReceipt::Submitted { should_consume: true, .. }));

    // Flip again before consuming: stamped messages keep their own flag.
    harness.cutover.set_consume_enabled(false);
    let summary = harness.drain().await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(handler.values_of("profile_id"), vec![serde_json::json!(2)]);
}

#[tokio::test]
async fn test_live_gate_uses_flag_at_consume_time() {
    let mut config = test_config(AdapterMode::Distributed);
    config.cutover.gate = GateMode::Live;
    let harness = DispatchHarness::from_config(config);
    harness.cutover.set_consume_enabled(false);
    let handler = RecordingHandler::new();
    harness.subscribe_profile(&handler);

    common::publish_profiles(&harness, &[(1, 1), (2, 2)]).await;
    harness.cutover.set_consume_enabled(true);
    let summary = harness.drain().await;

    assert_eq!(summary.dispatched, 2);
    assert_eq!(handler.count(), 2);
}

#[tokio::test]
async fn test_env_source_falls_back_to_configured_flag() {
    let mut config = test_config(AdapterMode::Distributed);
    config.cutover.source = CutoverSource::Env;
    config.cutover.env_var = "SWITCHYARD_INTEGRATION_FLAG_NEVER_SET".to_owned();
    config.cutover.consume_enabled = false;
    let harness = DispatchHarness::from_config(config);
    let handler = RecordingHandler::new();
    harness.subscribe_profile(&handler);

    let stamped = harness
        .pipeline
        .publish(PROFILE_UPDATED, &profile_attributes(3, 3))
        .await
        .unwrap();
    assert!(matches!(stamped, DeliveryReceipt::Submitted { should_consume: false, .. }));

    // The in-process override wins over the unset variable.
    harness.cutover.set_consume_enabled(true);
    common::publish_profiles(&harness, &[(3, 4)]).await;
    let summary = harness.drain().await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(handler.values_of("profile_id"), vec![serde_json::json!(4)]);
}
