//! Consumption cutover flag.
//!
//! The flag is read on every publish (distributed path) and, in live gate
//! mode, on every consumed record. Reads never take a lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tracing::info;

/// Default environment variable read by [`EnvCutover`].
pub const DEFAULT_CUTOVER_VAR: &str = "SWITCHYARD_CONSUME_ENABLED";

/// Source of the "consume" flag.
pub trait CutoverController: Send + Sync + fmt::Debug {
    /// Whether consumers should dispatch distributed messages.
    fn is_consume_enabled(&self) -> bool;

    /// Change the flag for this process.
    fn set_consume_enabled(&self, enabled: bool);
}

/// Process-local flag backed by an [`AtomicBool`].
#[derive(Debug, Default)]
pub struct AtomicCutover {
    enabled: AtomicBool,
}

impl AtomicCutover {
    /// Create a controller with the given initial value.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }
}

impl CutoverController for AtomicCutover {
    fn is_consume_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_consume_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(enabled, "Consume cutover flag changed");
        }
    }
}

const OVERRIDE_UNSET: u8 = 0;
const OVERRIDE_OFF: u8 = 1;
const OVERRIDE_ON: u8 = 2;

/// Reads the flag from an environment variable on every call.
///
/// An unset variable reads as the fallback, `false` unless changed with
/// [`with_fallback`](Self::with_fallback).
/// [`set_consume_enabled`](CutoverController::set_consume_enabled) installs
/// an in-process override that takes precedence over the variable until
/// [`clear_override`](Self::clear_override) is called.
pub struct EnvCutover {
    var: String,
    reader: fn(&str) -> Option<String>,
    fallback: bool,
    overridden: AtomicU8,
}

impl fmt::Debug for EnvCutover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCutover")
            .field("var", &self.var)
            .field("fallback", &self.fallback)
            .field("overridden", &self.overridden.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for EnvCutover {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOVER_VAR)
    }
}

impl EnvCutover {
    /// Read `var` from the process environment.
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self::with_reader(var, |name| std::env::var(name).ok())
    }

    /// Read `var` through a custom lookup function.
    #[must_use]
    pub fn with_reader(var: impl Into<String>, reader: fn(&str) -> Option<String>) -> Self {
        Self {
            var: var.into(),
            reader,
            fallback: false,
            overridden: AtomicU8::new(OVERRIDE_UNSET),
        }
    }

    /// Value reported while the variable is unset.
    #[must_use]
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// The variable this controller reads.
    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Drop the in-process override and fall back to the variable.
    pub fn clear_override(&self) {
        self.overridden.store(OVERRIDE_UNSET, Ordering::Release);
    }
}

impl CutoverController for EnvCutover {
    fn is_consume_enabled(&self) -> bool {
        match self.overridden.load(Ordering::Acquire) {
            OVERRIDE_ON => true,
            OVERRIDE_OFF => false,
            _ => (self.reader)(&self.var).map_or(self.fallback, |raw| {
                matches!(
                    raw.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            }),
        }
    }

    fn set_consume_enabled(&self, enabled: bool) {
        let value = if enabled { OVERRIDE_ON } else { OVERRIDE_OFF };
        self.overridden.store(value, Ordering::Release);
        info!(var = %self.var, enabled, "Consume cutover overridden in-process");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_toggle() {
        let cutover = AtomicCutover::default();
        assert!(!cutover.is_consume_enabled());
        cutover.set_consume_enabled(true);
        assert!(cutover.is_consume_enabled());
        cutover.set_consume_enabled(false);
        assert!(!cutover.is_consume_enabled());
    }

    #[test]
    fn test_env_reader_values() {
        let on = EnvCutover::with_reader("FLAG", |_| Some(" Yes ".to_owned()));
        assert!(on.is_consume_enabled());

        let off = EnvCutover::with_reader("FLAG", |_| Some("0".to_owned()));
        assert!(!off.is_consume_enabled());

        let unset = EnvCutover::with_reader("FLAG", |_| None);
        assert!(!unset.is_consume_enabled());

        let garbage = EnvCutover::with_reader("FLAG", |_| Some("perhaps".to_owned()));
        assert!(!garbage.is_consume_enabled());
    }

    #[test]
    fn test_env_fallback_applies_only_when_unset() {
        let unset = EnvCutover::with_reader("FLAG", |_| None).with_fallback(true);
        assert!(unset.is_consume_enabled());

        let off = EnvCutover::with_reader("FLAG", |_| Some("off".to_owned())).with_fallback(true);
        assert!(!off.is_consume_enabled());
    }

    #[test]
    fn test_env_override_wins_until_cleared() {
        let cutover = EnvCutover::with_reader("FLAG", |_| Some("true".to_owned()));
        cutover.set_consume_enabled(false);
        assert!(!cutover.is_consume_enabled());
        cutover.clear_override();
        assert!(cutover.is_consume_enabled());
    }

    #[test]
    fn test_env_reads_process_environment() {
        let cutover = EnvCutover::new("SWITCHYARD_TEST_FLAG_THAT_IS_NEVER_SET");
        assert_eq!(cutover.var(), "SWITCHYARD_TEST_FLAG_THAT_IS_NEVER_SET");
        assert!(!cutover.is_consume_enabled());
    }
}
