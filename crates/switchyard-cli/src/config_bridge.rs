//! Bridge from `switchyard_config::Config` to runtime settings.

use switchyard_config::Config;
use switchyard_telemetry::LogConfig;

/// Logging settings from the `[logging]` section, with `--verbose` applied.
#[must_use]
pub fn to_log_config(config: &Config, verbose: bool) -> LogConfig {
    let mut log = LogConfig::from(&config.logging);
    if verbose {
        "debug".clone_into(&mut log.level);
    }
    log
}
