//! Dispatch error types.

use std::time::Duration;

use switchyard_events::EventError;
use thiserror::Error;

use crate::adapter::DeliveryReceipt;

/// Failure reported by a subscriber's handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a handler error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by the transport client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transport could not be reached.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The transport did not answer in time.
    #[error("transport timed out after {0:?}")]
    Timeout(Duration),

    /// The transport refused the request.
    #[error("transport rejected request: {0}")]
    Rejected(String),
}

/// One adapter's failure inside a composite delivery.
#[derive(Debug)]
pub struct AdapterFailure {
    /// Name of the adapter that failed.
    pub adapter: &'static str,
    /// What went wrong.
    pub error: PublishError,
}

/// Errors returned by publish, subscribe, and local dispatch.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Unknown event, schema mismatch, partitioning, or codec failure.
    #[error(transparent)]
    Event(#[from] EventError),

    /// A subscriber's declared parameters do not match the event schema.
    #[error("subscriber {subscriber} for {event}: missing {missing:?}, unexpected {unexpected:?}")]
    InvalidSubscriber {
        /// The event subscribed to.
        event: String,
        /// The subscriber name.
        subscriber: String,
        /// Required attributes the subscriber does not declare.
        missing: Vec<String>,
        /// Declared parameters that are not part of the schema.
        unexpected: Vec<String>,
    },

    /// The transport did not accept a submission.
    #[error("delivery failed: {0}")]
    Delivery(#[from] TransportError),

    /// A subscriber failed during local dispatch.
    #[error("subscriber {subscriber} failed handling {event}: {source}")]
    Dispatch {
        /// The event being dispatched.
        event: String,
        /// The failing subscriber.
        subscriber: String,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },

    /// Some adapters of a composite delivery failed; all were attempted.
    #[error("{} of {attempted} delivery adapters failed", .failures.len())]
    Partial {
        /// Number of adapters invoked.
        attempted: usize,
        /// Receipts from adapters that succeeded, in adapter order.
        receipts: Vec<DeliveryReceipt>,
        /// Failures from adapters that did not, in adapter order.
        failures: Vec<AdapterFailure>,
    },
}

impl PublishError {
    /// True for an unregistered event name.
    #[must_use]
    pub fn is_unknown_event(&self) -> bool {
        matches!(self, Self::Event(EventError::UnknownEvent { .. }))
    }

    /// True for an attribute set that does not match the schema.
    #[must_use]
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::Event(EventError::SchemaMismatch { .. }))
    }
}

/// Result type for dispatch operations.
pub type PublishResult<T> = Result<T, PublishError>;
