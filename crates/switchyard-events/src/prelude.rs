//! Prelude module - commonly used types for convenient import.
//!
//! Use `use switchyard_events::prelude::*;` to import all essential types.

// Schemas
pub use crate::{AttributeDiff, Attributes, EventDefinition, EventSchemaRegistry, attributes};

// Envelopes and routing
pub use crate::{Envelope, PartitionKey, PartitionKeyResolver};

// Errors
pub use crate::{EventError, EventResult};
