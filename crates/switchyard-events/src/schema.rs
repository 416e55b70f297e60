//! Event definitions and the schema registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::attributes::{AttributeDiff, Attributes};
use crate::error::{EventError, EventResult};

/// A named event and the exact attribute set every occurrence must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    name: String,
    required_attributes: BTreeSet<String>,
}

impl EventDefinition {
    /// Create a definition from a name and its required attribute names.
    pub fn new<I, S>(name: impl Into<String>, required_attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            required_attributes: required_attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// The unique event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The required attribute names.
    #[must_use]
    pub fn required_attributes(&self) -> &BTreeSet<String> {
        &self.required_attributes
    }

    /// Compare a set of names against the required attributes.
    pub fn diff<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> AttributeDiff {
        AttributeDiff::between(&self.required_attributes, names)
    }

    /// Check that `attributes` carries exactly the required attribute keys.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SchemaMismatch`] when keys are missing or extra.
    pub fn check(&self, attributes: &Attributes) -> EventResult<()> {
        let diff = self.diff(attributes.keys().map(String::as_str));
        if diff.is_exact() {
            Ok(())
        } else {
            Err(EventError::SchemaMismatch {
                event: self.name.clone(),
                missing: diff.missing,
                unexpected: diff.unexpected,
            })
        }
    }
}

type Definitions = HashMap<String, Arc<EventDefinition>>;

/// Registry of event definitions for one logical topic.
///
/// Registration happens during a warm-up window at startup; afterwards the
/// registry is read-mostly. Reads load an immutable snapshot without taking a
/// lock, while each registration clones the current map and swaps in a new
/// snapshot. Calling [`freeze`](Self::freeze) ends the warm-up window.
#[derive(Debug, Default)]
pub struct EventSchemaRegistry {
    snapshot: ArcSwap<Definitions>,
    /// Serializes writers so no registration is lost between clone and swap.
    writer: Mutex<()>,
    frozen: AtomicBool,
}

impl EventSchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event with its required attribute names.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DuplicateEvent`] if the name is already
    /// registered, or [`EventError::RegistryFrozen`] after [`freeze`](Self::freeze).
    pub fn register<I, S>(
        &self,
        name: impl Into<String>,
        required_attributes: I,
    ) -> EventResult<Arc<EventDefinition>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_definition(EventDefinition::new(name, required_attributes))
    }

    /// Register a prebuilt definition.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_definition(
        &self,
        definition: EventDefinition,
    ) -> EventResult<Arc<EventDefinition>> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if self.frozen.load(Ordering::Acquire) {
            return Err(EventError::RegistryFrozen {
                name: definition.name,
            });
        }

        let current = self.snapshot.load();
        if current.contains_key(&definition.name) {
            return Err(EventError::DuplicateEvent {
                name: definition.name,
            });
        }

        let definition = Arc::new(definition);
        let mut next: Definitions = (**current).clone();
        next.insert(definition.name.clone(), Arc::clone(&definition));
        self.snapshot.store(Arc::new(next));

        debug!(
            event = %definition.name,
            attributes = ?definition.required_attributes,
            "Registered event"
        );
        Ok(definition)
    }

    /// Look up a definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] if the name is not registered.
    pub fn lookup(&self, name: &str) -> EventResult<Arc<EventDefinition>> {
        self.snapshot
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| EventError::UnknownEvent {
                name: name.to_owned(),
            })
    }

    /// Look up `name` and check `attributes` against it.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] or [`EventError::SchemaMismatch`].
    pub fn validate(
        &self,
        name: &str,
        attributes: &Attributes,
    ) -> EventResult<Arc<EventDefinition>> {
        let definition = self.lookup(name)?;
        definition.check(attributes)?;
        Ok(definition)
    }

    /// Reject any further registrations.
    pub fn freeze(&self) {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.frozen.swap(true, Ordering::AcqRel) {
            info!(events = self.len(), "Event registry frozen");
        }
    }

    /// Whether [`freeze`](Self::freeze) has been called.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot.load().contains_key(name)
    }

    /// Registered event names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Whether no events are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}
