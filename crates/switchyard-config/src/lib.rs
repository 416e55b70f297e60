#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Switchyard dispatch core.
//!
//! A single [`Config`] type covers adapter selection, the consume cutover
//! flag, the publish throttle, consumer batch/liveness budgets, partition
//! keys, and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use switchyard_config::Config;
//!
//! // defaults → ./switchyard.toml (if present) → SWITCHYARD_* env fallbacks
//! let resolved = Config::load(None).unwrap();
//! println!("adapter: {}", resolved.config.dispatch.adapter);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** (explicit path, or `./switchyard.toml`)
//! 2. **Environment variables** (`SWITCHYARD_*`): fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal switchyard crates**.
//! Conversion to runtime types happens where the dispatch core is wired up.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with source tracking.
pub mod merge;
/// Resolved configuration display and serialization.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// With `path = None`, `./switchyard.toml` is used when it exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(path)
    }

    /// Load configuration from a single file (no layering, no environment).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
