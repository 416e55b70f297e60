//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, CutoverSource};

/// Upper bound on messages pulled per poll.
const MAX_BATCH_SIZE_UPPER_BOUND: usize = 10_000;

/// Upper bound on parallel workers.
const MAX_WORKERS: usize = 1_024;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_dispatch(config)?;
    validate_cutover(config)?;
    validate_consumer(config)?;
    validate_transport(config)?;
    validate_partitioning(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_dispatch(config: &Config) -> ConfigResult<()> {
    let d = &config.dispatch;

    if d.topic.trim().is_empty() {
        return Err(invalid("dispatch.topic", "topic must not be empty"));
    }

    if d.throttle_percent > 100 {
        return Err(invalid(
            "dispatch.throttle_percent",
            format!("{} is out of range; must be between 0 and 100", d.throttle_percent),
        ));
    }

    Ok(())
}

fn validate_cutover(config: &Config) -> ConfigResult<()> {
    let c = &config.cutover;
    if c.source == CutoverSource::Env && c.env_var.trim().is_empty() {
        return Err(invalid(
            "cutover.env_var",
            "env_var must name a variable when source is \"env\"",
        ));
    }
    Ok(())
}

fn validate_consumer(config: &Config) -> ConfigResult<()> {
    let c = &config.consumer;

    if c.workers == 0 || c.workers > MAX_WORKERS {
        return Err(invalid(
            "consumer.workers",
            format!("workers must be between 1 and {MAX_WORKERS}"),
        ));
    }

    if c.max_batch_size == 0 || c.max_batch_size > MAX_BATCH_SIZE_UPPER_BOUND {
        return Err(invalid(
            "consumer.max_batch_size",
            format!("max_batch_size must be between 1 and {MAX_BATCH_SIZE_UPPER_BOUND}"),
        ));
    }

    if c.liveness_deadline_ms == 0 {
        return Err(invalid(
            "consumer.liveness_deadline_ms",
            "liveness_deadline_ms must be positive",
        ));
    }

    if c.heartbeat_interval_ms == 0 || c.heartbeat_interval_ms >= c.liveness_deadline_ms {
        return Err(invalid(
            "consumer.heartbeat_interval_ms",
            format!(
                "heartbeat_interval_ms ({}) must be positive and below liveness_deadline_ms ({})",
                c.heartbeat_interval_ms, c.liveness_deadline_ms
            ),
        ));
    }

    if c.poll_timeout_ms >= c.liveness_deadline_ms {
        return Err(invalid(
            "consumer.poll_timeout_ms",
            format!(
                "poll_timeout_ms ({}) must be below liveness_deadline_ms ({})",
                c.poll_timeout_ms, c.liveness_deadline_ms
            ),
        ));
    }

    Ok(())
}

fn validate_transport(config: &Config) -> ConfigResult<()> {
    if config.transport.partitions == 0 {
        return Err(invalid(
            "transport.partitions",
            "partitions must be at least 1",
        ));
    }
    Ok(())
}

fn validate_partitioning(config: &Config) -> ConfigResult<()> {
    for (event, keys) in &config.partitioning.keys {
        if keys.is_empty() {
            return Err(invalid(
                &format!("partitioning.keys.{event}"),
                "key attribute list must not be empty; remove the entry to hash all attributes",
            ));
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error, off",
                l.level
            ),
        ));
    }

    if !matches!(
        l.format.to_ascii_lowercase().as_str(),
        "pretty" | "compact" | "json"
    ) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        ));
    }

    Ok(())
}
