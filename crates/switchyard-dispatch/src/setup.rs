//! Building dispatch components from [`switchyard_config::Config`].

use std::collections::HashMap;
use std::sync::Arc;

use switchyard_config::{
    AdapterMode, Config, CutoverSource, GateMode, PartitioningSection,
};
use switchyard_events::PartitionKeyResolver;

use crate::adapter::{CompositeAdapter, DeliveryAdapter, DistributedAdapter, InlineAdapter};
use crate::cutover::{AtomicCutover, CutoverController, EnvCutover};
use crate::transport::Transport;
use crate::worker::{ConsumeGate, WorkerConfig};

/// The configured adapter plus a handle to its distributed member, if any,
/// so the throttle can be changed at runtime.
#[derive(Debug, Clone)]
pub struct DeliverySetup {
    /// Adapter to install on the pipeline.
    pub adapter: Arc<dyn DeliveryAdapter>,
    /// The distributed adapter inside `adapter`, for throttle control.
    pub distributed: Option<Arc<DistributedAdapter>>,
}

/// Partition key resolver for the configured key attributes.
#[must_use]
pub fn partition_resolver(section: &PartitioningSection) -> PartitionKeyResolver {
    let table: HashMap<String, Vec<String>> = section
        .keys
        .iter()
        .map(|(event, keys)| (event.clone(), keys.clone()))
        .collect();
    PartitionKeyResolver::from_table(table)
}

/// Cutover controller for `[cutover] source`.
///
/// `flag` is seeded with `consume_enabled`. `env` reads `env_var` on every
/// check and uses `consume_enabled` while the variable is unset.
#[must_use]
pub fn cutover(config: &Config) -> Arc<dyn CutoverController> {
    let section = &config.cutover;
    match section.source {
        CutoverSource::Flag => Arc::new(AtomicCutover::new(section.consume_enabled)),
        CutoverSource::Env => Arc::new(
            EnvCutover::new(section.env_var.clone()).with_fallback(section.consume_enabled),
        ),
    }
}

/// Worker settings from the `[consumer]` and `[cutover]` sections.
#[must_use]
pub fn worker_config(config: &Config) -> WorkerConfig {
    WorkerConfig {
        max_batch_size: config.consumer.max_batch_size,
        poll_timeout: config.consumer.poll_timeout(),
        liveness_deadline: config.consumer.liveness_deadline(),
        heartbeat_interval: config.consumer.heartbeat_interval(),
        gate: match config.cutover.gate {
            GateMode::Stamped => ConsumeGate::Stamped,
            GateMode::Live => ConsumeGate::Live,
        },
    }
}

/// Build the delivery adapter selected by `[dispatch] adapter`.
///
/// Dual mode runs inline delivery first, then the distributed submit.
#[must_use]
pub fn delivery(
    config: &Config,
    transport: Arc<dyn Transport>,
    cutover: Arc<dyn CutoverController>,
) -> DeliverySetup {
    let distributed = || {
        Arc::new(
            DistributedAdapter::new(
                Arc::clone(&transport),
                partition_resolver(&config.partitioning),
                Arc::clone(&cutover),
            )
            .with_throttle_percent(config.dispatch.throttle_percent),
        )
    };

    match config.dispatch.adapter {
        AdapterMode::Inline => DeliverySetup {
            adapter: Arc::new(InlineAdapter::new()),
            distributed: None,
        },
        AdapterMode::Distributed => {
            let distributed = distributed();
            DeliverySetup {
                adapter: distributed.clone(),
                distributed: Some(distributed),
            }
        },
        AdapterMode::Dual => {
            let distributed = distributed();
            let members: Vec<Arc<dyn DeliveryAdapter>> =
                vec![Arc::new(InlineAdapter::new()), distributed.clone()];
            DeliverySetup {
                adapter: Arc::new(CompositeAdapter::new(members)),
                distributed: Some(distributed),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::InMemoryTransport;

    fn build(mode: AdapterMode) -> DeliverySetup {
        let mut config = Config::default();
        config.dispatch.adapter = mode;
        config.dispatch.throttle_percent = 40;
        delivery(
            &config,
            Arc::new(InMemoryTransport::new(2)),
            cutover(&config),
        )
    }

    #[test]
    fn test_adapter_modes() {
        let inline = build(AdapterMode::Inline);
        assert_eq!(inline.adapter.name(), "inline");
        assert!(inline.distributed.is_none());

        let distributed = build(AdapterMode::Distributed);
        assert_eq!(distributed.adapter.name(), "distributed");
        assert_eq!(distributed.distributed.unwrap().throttle_percent(), 40);

        let dual = build(AdapterMode::Dual);
        assert_eq!(dual.adapter.name(), "composite");
        assert!(dual.distributed.is_some());
    }

    #[test]
    fn test_worker_config_mapping() {
        let mut config = Config::default();
        config.cutover.gate = GateMode::Live;
        config.consumer.max_batch_size = 7;
        let worker = worker_config(&config);
        assert_eq!(worker.gate, ConsumeGate::Live);
        assert_eq!(worker.max_batch_size, 7);
        assert_eq!(worker.liveness_deadline, Duration::from_secs(30));
    }

    #[test]
    fn test_partition_resolver_from_section() {
        let mut section = PartitioningSection::default();
        section
            .keys
            .insert("profile_updated".to_owned(), vec!["account_id".to_owned()]);
        let resolver = partition_resolver(&section);
        assert_eq!(
            resolver.key_attributes("profile_updated"),
            Some(&["account_id".to_owned()][..])
        );
        assert!(resolver.key_attributes("other").is_none());
    }

    #[test]
    fn test_cutover_seeded_from_config() {
        let mut config = Config::default();
        config.cutover.consume_enabled = true;
        let flag = cutover(&config);
        assert!(flag.is_consume_enabled());
        assert!(format!("{flag:?}").starts_with("AtomicCutover"));
    }

    #[test]
    fn test_env_cutover_from_config() {
        let mut config = Config::default();
        config.cutover.source = CutoverSource::Env;
        config.cutover.env_var = "SWITCHYARD_SETUP_TEST_FLAG_NEVER_SET".to_owned();
        config.cutover.consume_enabled = true;

        let env = cutover(&config);
        assert!(format!("{env:?}").starts_with("EnvCutover"));
        // Unset variable falls back to the configured value.
        assert!(env.is_consume_enabled());
        env.set_consume_enabled(false);
        assert!(!env.is_consume_enabled());
    }
}
