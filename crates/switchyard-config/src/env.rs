//! Environment variable fallbacks.
//!
//! `SWITCHYARD_*` variables fill in fields that no config file set. A field
//! set explicitly by a file always wins over the environment.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::merge::{ConfigLayer, FieldSources, set_nested};

/// Prefix shared by every recognised variable.
pub const ENV_PREFIX: &str = "SWITCHYARD_";

#[derive(Debug, Clone, Copy)]
enum Kind {
    Str,
    Int,
    Bool,
}

/// Variable name, dotted field path, value kind.
const ENV_FIELDS: &[(&str, &str, Kind)] = &[
    ("SWITCHYARD_TOPIC", "dispatch.topic", Kind::Str),
    ("SWITCHYARD_ADAPTER", "dispatch.adapter", Kind::Str),
    ("SWITCHYARD_THROTTLE_PERCENT", "dispatch.throttle_percent", Kind::Int),
    ("SWITCHYARD_CONSUME_ENABLED", "cutover.consume_enabled", Kind::Bool),
    ("SWITCHYARD_CONSUME_GATE", "cutover.gate", Kind::Str),
    ("SWITCHYARD_CUTOVER_SOURCE", "cutover.source", Kind::Str),
    ("SWITCHYARD_WORKERS", "consumer.workers", Kind::Int),
    ("SWITCHYARD_MAX_BATCH_SIZE", "consumer.max_batch_size", Kind::Int),
    ("SWITCHYARD_LIVENESS_DEADLINE_MS", "consumer.liveness_deadline_ms", Kind::Int),
    ("SWITCHYARD_HEARTBEAT_INTERVAL_MS", "consumer.heartbeat_interval_ms", Kind::Int),
    ("SWITCHYARD_LOG_LEVEL", "logging.level", Kind::Str),
    ("SWITCHYARD_LOG_FORMAT", "logging.format", Kind::Str),
];

/// Snapshot all `SWITCHYARD_*` variables from the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

/// Parse a boolean flag value (`1/true/yes/on`, `0/false/no/off`).
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment fallbacks to fields not set by a config file.
///
/// Returns the number of fields filled from the environment.
pub fn apply_env_fallbacks(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String>,
) -> usize {
    let mut applied: usize = 0;

    for (var, field, kind) in ENV_FIELDS {
        let Some(raw) = env_vars.get(*var) else {
            continue;
        };
        if sources.get(*field) == Some(&ConfigLayer::File) {
            debug!(var, field, "config file value takes precedence over environment");
            continue;
        }

        let value = match kind {
            Kind::Str => Some(toml::Value::String(raw.clone())),
            Kind::Int => raw.trim().parse::<i64>().ok().map(toml::Value::Integer),
            Kind::Bool => parse_bool(raw).map(toml::Value::Boolean),
        };
        let Some(value) = value else {
            warn!(var, value = %raw, "ignoring unparseable environment variable");
            continue;
        };

        let path: Vec<&str> = field.split('.').collect();
        set_nested(merged, &path, value);
        sources.insert((*field).to_owned(), ConfigLayer::Environment);
        applied = applied.saturating_add(1);
    }

    applied
}
