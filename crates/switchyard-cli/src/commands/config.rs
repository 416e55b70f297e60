//! Config command: show and validate the resolved configuration.

use std::path::Path;

use anyhow::{Context, Result, bail};
use switchyard_config::merge::ConfigLayer;
use switchyard_config::{Config, ResolvedConfig, ShowFormat};

use crate::theme::Theme;

/// Print the resolved configuration, optionally limited to one section.
pub(crate) fn show_config(path: Option<&Path>, format: &str, section: Option<&str>) -> Result<()> {
    let resolved = Config::load(path).context("failed to load configuration")?;
    let format = parse_format(format)?;
    println!("{}", render(&resolved, format, section)?);

    let overridden = overridden_fields(&resolved);
    if !overridden.is_empty() {
        eprintln!();
        eprintln!("{}", Theme::header("Sources"));
        for (field, layer) in overridden {
            eprintln!("{}", Theme::kv(&field, &layer.to_string()));
        }
    }
    if !resolved.loaded_files.is_empty() {
        eprintln!(
            "{}",
            Theme::dimmed(&format!("loaded from {}", resolved.loaded_files.join(", ")))
        );
    }
    Ok(())
}

/// Load and validate the configuration, reporting the outcome.
pub(crate) fn check_config(path: Option<&Path>) -> Result<()> {
    match Config::load(path) {
        Ok(resolved) => {
            println!("{}", Theme::success("Configuration is valid"));
            let config = &resolved.config;
            println!("{}", Theme::kv("topic", &config.dispatch.topic));
            println!("{}", Theme::kv("adapter", &Theme::adapter(config.dispatch.adapter)));
            println!(
                "{}",
                Theme::kv("throttle", &format!("{}%", config.dispatch.throttle_percent))
            );
            println!(
                "{}",
                Theme::kv("consume", &config.cutover.consume_enabled.to_string())
            );
            println!("{}", Theme::kv("workers", &config.consumer.workers.to_string()));
            println!(
                "{}",
                Theme::kv("partitions", &config.transport.partitions.to_string())
            );
            Ok(())
        },
        Err(e) => {
            println!("{}", Theme::error(&e.to_string()));
            bail!("configuration is invalid")
        },
    }
}

fn parse_format(format: &str) -> Result<ShowFormat> {
    match format.to_ascii_lowercase().as_str() {
        "toml" => Ok(ShowFormat::Toml),
        "json" => Ok(ShowFormat::Json),
        other => bail!("unknown format '{other}'; expected toml or json"),
    }
}

fn render(resolved: &ResolvedConfig, format: ShowFormat, section: Option<&str>) -> Result<String> {
    let Some(section) = section else {
        return Ok(resolved.render(format)?);
    };

    match format {
        ShowFormat::Json => {
            let value = serde_json::to_value(&resolved.config)?;
            let part = value
                .get(section)
                .with_context(|| format!("no such section '{section}'"))?;
            Ok(serde_json::to_string_pretty(part)?)
        },
        ShowFormat::Toml => {
            let value = toml::Value::try_from(&resolved.config)?;
            let part = value
                .get(section)
                .with_context(|| format!("no such section '{section}'"))?;
            Ok(toml::to_string_pretty(part)?)
        },
    }
}

/// Fields set by a file or the environment, sorted by path.
fn overridden_fields(resolved: &ResolvedConfig) -> Vec<(String, ConfigLayer)> {
    resolved
        .field_sources
        .iter()
        .filter(|(_, layer)| **layer != ConfigLayer::Defaults)
        .map(|(field, layer)| (field.clone(), layer.clone()))
        .collect()
}
