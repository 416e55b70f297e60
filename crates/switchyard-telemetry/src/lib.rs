//! Switchyard Telemetry - Logging and instrumentation for the Switchyard dispatch core.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - The fire-and-forget [`MetricsSink`] boundary used by publishers and workers
//! - Ready-made sinks: [`NoopMetrics`], [`TracingMetrics`], [`InMemoryMetrics`]
//!
//! # Example
//!
//! ```rust,no_run
//! use switchyard_telemetry::{
//!     Counter, InMemoryMetrics, LogConfig, LogFormat, MetricsSink, setup_logging,
//! };
//!
//! # fn main() -> Result<(), switchyard_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("switchyard_dispatch=debug");
//! let _guard = setup_logging(&config)?;
//!
//! let metrics = InMemoryMetrics::new();
//! metrics.increment(Counter::Published, "profile_updated");
//! assert_eq!(metrics.get(Counter::Published, "profile_updated"), 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;
mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogGuard, LogTarget, setup_default_logging, setup_logging};
pub use metrics::{Counter, InMemoryMetrics, MetricsSink, NoopMetrics, TracingMetrics};
