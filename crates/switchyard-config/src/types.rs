//! Configuration types for the Switchyard dispatch core.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal switchyard crates. Every struct implements [`Default`] so that a
//! bare `[section]` header in TOML produces a working configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Publish-side delivery settings.
    pub dispatch: DispatchSection,
    /// Consumption cutover flag and gate semantics.
    pub cutover: CutoverSection,
    /// Consumer worker batch and liveness settings.
    pub consumer: ConsumerSection,
    /// In-process transport settings.
    pub transport: TransportSection,
    /// Per-event partition key attributes.
    pub partitioning: PartitioningSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// DispatchSection
// ---------------------------------------------------------------------------

/// Which delivery path publishes go through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterMode {
    /// Synchronous in-process delivery only.
    #[default]
    Inline,
    /// Submission to the distributed transport only.
    Distributed,
    /// Both paths, inline first.
    Dual,
}

impl std::fmt::Display for AdapterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Distributed => write!(f, "distributed"),
            Self::Dual => write!(f, "dual"),
        }
    }
}

impl std::str::FromStr for AdapterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "distributed" => Ok(Self::Distributed),
            "dual" => Ok(Self::Dual),
            other => Err(format!(
                "unknown adapter '{other}'; expected inline, distributed or dual"
            )),
        }
    }
}

/// Publish-side delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Transport topic events are published to.
    pub topic: String,
    /// Delivery adapter selection.
    pub adapter: AdapterMode,
    /// Percentage (0-100) of publishes forwarded to the distributed transport.
    pub throttle_percent: u8,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            topic: "events".to_owned(),
            adapter: AdapterMode::Inline,
            throttle_percent: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// CutoverSection
// ---------------------------------------------------------------------------

/// How consumers decide whether to dispatch a received message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Honour the flag stamped on the envelope at publish time.
    #[default]
    Stamped,
    /// Read the live cutover flag when the message is consumed.
    Live,
}

/// Where the consume flag lives at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutoverSource {
    /// In-process flag seeded from `consume_enabled`.
    #[default]
    Flag,
    /// Environment variable `env_var`, re-read on every check. Falls back to
    /// `consume_enabled` while the variable is unset.
    Env,
}

/// Consumption cutover settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoverSection {
    /// Initial value of the consume flag.
    pub consume_enabled: bool,
    /// Gate semantics on the consumer side.
    pub gate: GateMode,
    /// Backing store for the flag.
    pub source: CutoverSource,
    /// Variable read when `source = "env"`.
    pub env_var: String,
}

impl Default for CutoverSection {
    fn default() -> Self {
        Self {
            consume_enabled: false,
            gate: GateMode::Stamped,
            source: CutoverSource::Flag,
            env_var: "SWITCHYARD_CONSUME_ENABLED".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConsumerSection
// ---------------------------------------------------------------------------

/// Consumer worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSection {
    /// Number of parallel workers.
    pub workers: usize,
    /// Maximum messages pulled per poll.
    pub max_batch_size: usize,
    /// How long a poll waits for messages.
    pub poll_timeout_ms: u64,
    /// Time without a heartbeat after which the group evicts the worker.
    pub liveness_deadline_ms: u64,
    /// Target spacing between heartbeats, including mid-batch.
    pub heartbeat_interval_ms: u64,
}

impl Default for ConsumerSection {
    fn default() -> Self {
        Self {
            workers: 1,
            max_batch_size: 100,
            poll_timeout_ms: 1_000,
            liveness_deadline_ms: 30_000,
            heartbeat_interval_ms: 10_000,
        }
    }
}

impl ConsumerSection {
    /// Poll timeout as a [`Duration`].
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Liveness deadline as a [`Duration`].
    #[must_use]
    pub fn liveness_deadline(&self) -> Duration {
        Duration::from_millis(self.liveness_deadline_ms)
    }

    /// Heartbeat interval as a [`Duration`].
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// TransportSection
// ---------------------------------------------------------------------------

/// In-process transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    /// Number of partitions per topic.
    pub partitions: u32,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self { partitions: 8 }
    }
}

// ---------------------------------------------------------------------------
// PartitioningSection
// ---------------------------------------------------------------------------

/// Partition key configuration.
///
/// ```toml
/// [partitioning.keys]
/// profile_updated = ["account_id"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningSection {
    /// Event name → ordered key attributes. Events not listed hash all values.
    pub keys: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`).
    pub format: String,
    /// Extra filter directives such as `switchyard_dispatch=debug`.
    pub directives: Vec<String>,
    /// Write rolling log files here instead of stderr.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}
