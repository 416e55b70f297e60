//! Switchyard Events - Event schemas and envelopes for the Switchyard dispatch core.
//!
//! This crate provides:
//! - Event definitions and a copy-on-write schema registry
//! - Attribute maps with deterministic ordering
//! - Transport envelopes and their JSON wire encoding
//! - Deterministic partition keys
//!
//! # Example
//!
//! ```rust
//! use switchyard_events::{EventSchemaRegistry, PartitionKeyResolver, attributes};
//!
//! let registry = EventSchemaRegistry::new();
//! registry
//!     .register("profile_updated", ["account_id", "profile_id"])
//!     .unwrap();
//! registry.freeze();
//!
//! let attrs = attributes([("account_id", 1), ("profile_id", 2)]);
//! registry.validate("profile_updated", &attrs).unwrap();
//!
//! let resolver =
//!     PartitionKeyResolver::new().with_key_attributes("profile_updated", ["account_id"]);
//! let key = resolver.resolve("profile_updated", &attrs).unwrap();
//! assert!(key.partition(8) < 8);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod attributes;
mod envelope;
mod error;
mod partition;
mod schema;

pub use attributes::{AttributeDiff, Attributes, attributes};
pub use envelope::Envelope;
pub use error::{EventError, EventResult};
pub use partition::{PartitionKey, PartitionKeyResolver};
pub use schema::{EventDefinition, EventSchemaRegistry};
