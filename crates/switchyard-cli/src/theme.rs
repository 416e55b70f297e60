//! CLI theme and styling.

use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("  {:<18} {}", format!("{key}:").bold(), value)
    }

    /// Format an adapter mode.
    pub(crate) fn adapter(mode: switchyard_config::AdapterMode) -> String {
        match mode {
            switchyard_config::AdapterMode::Inline => "inline".green().to_string(),
            switchyard_config::AdapterMode::Distributed => "distributed".blue().to_string(),
            switchyard_config::AdapterMode::Dual => "dual".magenta().to_string(),
        }
    }
}
