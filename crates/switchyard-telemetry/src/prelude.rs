//! Prelude module - commonly used types for convenient import.
//!
//! Use `use switchyard_telemetry::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust,no_run
//! use switchyard_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("switchyard_dispatch=trace");
//!
//! let _guard = setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{LogConfig, LogFormat, LogGuard, LogTarget};

// Setup functions
pub use crate::{setup_default_logging, setup_logging};

// Instrumentation
pub use crate::{Counter, InMemoryMetrics, MetricsSink, NoopMetrics, TracingMetrics};
