//! Event schema error types.

use thiserror::Error;

/// Errors raised while registering, validating, or encoding events.
#[derive(Debug, Error)]
pub enum EventError {
    /// The event name has not been registered.
    #[error("unknown event: {name}")]
    UnknownEvent {
        /// The unregistered event name.
        name: String,
    },

    /// The event name was registered twice.
    #[error("event already registered: {name}")]
    DuplicateEvent {
        /// The duplicated event name.
        name: String,
    },

    /// The registry no longer accepts registrations.
    #[error("registry is frozen; cannot register {name}")]
    RegistryFrozen {
        /// The event name that was rejected.
        name: String,
    },

    /// The attribute keys of a publish did not match the declared schema.
    #[error("schema mismatch for {event}: missing {missing:?}, unexpected {unexpected:?}")]
    SchemaMismatch {
        /// The event being published.
        event: String,
        /// Required attributes that were absent.
        missing: Vec<String>,
        /// Attributes that are not part of the schema.
        unexpected: Vec<String>,
    },

    /// A configured partition attribute was absent from the attributes.
    #[error("partition attribute {attribute} missing for {event}")]
    MissingPartitionAttribute {
        /// The event being routed.
        event: String,
        /// The configured key attribute that was absent.
        attribute: String,
    },

    /// A configured partition attribute is not part of the event's schema.
    #[error("partition attribute {attribute} is not declared by {event}")]
    UndeclaredPartitionAttribute {
        /// The event the key is configured for.
        event: String,
        /// The configured key attribute.
        attribute: String,
    },

    /// Wire payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;
