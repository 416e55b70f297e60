//! Subscribers and their handlers.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use switchyard_events::{AttributeDiff, Attributes, EventDefinition};

use crate::error::HandlerError;

/// Reacts to a dispatched event.
///
/// Handlers run on the dispatching task: the publisher's task for inline
/// delivery and the worker's task for distributed delivery.
pub trait EventHandler: Send + Sync {
    /// Handle one event occurrence.
    ///
    /// # Errors
    ///
    /// Any error is reported to the dispatcher, which stops inline delivery
    /// or counts the record as failed on the consumer side.
    fn handle(&self, attributes: &Attributes) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&Attributes) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, attributes: &Attributes) -> Result<(), HandlerError> {
        self(attributes)
    }
}

/// A named handler with the attribute names it expects.
#[derive(Clone)]
pub struct Subscriber {
    name: String,
    parameters: BTreeSet<String>,
    handler: Arc<dyn EventHandler>,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl Subscriber {
    /// Create a subscriber from a closure.
    pub fn new<I, S, F>(name: impl Into<String>, parameters: I, handler: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Attributes) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self::with_handler(name, parameters, Arc::new(handler))
    }

    /// Create a subscriber around a shared handler.
    pub fn with_handler<I, S>(
        name: impl Into<String>,
        parameters: I,
        handler: Arc<dyn EventHandler>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            handler,
        }
    }

    /// Subscriber name, used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter names.
    #[must_use]
    pub fn parameters(&self) -> &BTreeSet<String> {
        &self.parameters
    }

    /// Compare the declared parameters against an event definition.
    #[must_use]
    pub fn diff(&self, definition: &EventDefinition) -> AttributeDiff {
        definition.diff(self.parameters.iter().map(String::as_str))
    }

    pub(crate) fn handle(&self, attributes: &Attributes) -> Result<(), HandlerError> {
        self.handler.handle(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_handler() {
        let subscriber = Subscriber::new("reject", ["a"], |attrs: &Attributes| {
            if attrs.contains_key("a") {
                Err(HandlerError::new("no"))
            } else {
                Ok(())
            }
        });
        let attrs = switchyard_events::attributes([("a", 1)]);
        assert_eq!(subscriber.handle(&attrs), Err(HandlerError::new("no")));
        assert!(subscriber.handle(&Attributes::new()).is_ok());
    }

    #[test]
    fn test_diff_against_definition() {
        let definition = EventDefinition::new("e", ["a", "b"]);
        let exact = Subscriber::new("s", ["b", "a"], |_: &Attributes| Ok(()));
        assert!(exact.diff(&definition).is_exact());

        let off = Subscriber::new("s", ["a", "c"], |_: &Attributes| Ok(()));
        let diff = off.diff(&definition);
        assert_eq!(diff.missing, vec!["b".to_owned()]);
        assert_eq!(diff.unexpected, vec!["c".to_owned()]);
    }
}
