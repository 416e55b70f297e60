//! Deterministic partition keys.
//!
//! A key is a blake3 digest over the JSON encoding of selected attribute
//! values. Only values contribute, never the event name, so events about the
//! same entity share a partition even when their event names differ.

use std::collections::HashMap;
use std::fmt;

use crate::attributes::Attributes;
use crate::error::{EventError, EventResult};
use crate::schema::EventSchemaRegistry;

/// Separator written between attribute values before hashing.
const VALUE_SEPARATOR: &[u8] = &[0x1f];

/// Stable routing key for the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionKey([u8; 32]);

impl PartitionKey {
    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Map the key onto one of `count` partitions.
    ///
    /// Returns partition `0` when `count` is zero.
    #[must_use]
    pub fn partition(&self, count: u32) -> u32 {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&self.0[..8]);
        let value = u64::from_le_bytes(prefix);
        value
            .checked_rem(u64::from(count))
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(0)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Derives partition keys from event attributes.
///
/// By default every attribute value contributes, in key order. Events can be
/// configured to key on a specific, ordered list of attributes instead.
#[derive(Debug, Clone, Default)]
pub struct PartitionKeyResolver {
    key_attributes: HashMap<String, Vec<String>>,
}

impl PartitionKeyResolver {
    /// Resolver that hashes all attribute values for every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key `event` on the listed attributes, in the given order.
    #[must_use]
    pub fn with_key_attributes<I, S>(mut self, event: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_attributes
            .insert(event.into(), attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Build a resolver from an event → key-attributes table.
    #[must_use]
    pub fn from_table(table: HashMap<String, Vec<String>>) -> Self {
        Self {
            key_attributes: table,
        }
    }

    /// The configured key attributes for `event`, if any.
    #[must_use]
    pub fn key_attributes(&self, event: &str) -> Option<&[String]> {
        self.key_attributes.get(event).map(Vec::as_slice)
    }

    /// Check every configured key against `registry`.
    ///
    /// Run once at startup so that a misconfigured key fails there instead of
    /// on every publish of the event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] for a keyed event that is not
    /// registered and [`EventError::UndeclaredPartitionAttribute`] for a key
    /// attribute outside the event's required attributes.
    pub fn check(&self, registry: &EventSchemaRegistry) -> EventResult<()> {
        let mut events: Vec<&String> = self.key_attributes.keys().collect();
        events.sort();
        for event in events {
            let definition = registry.lookup(event)?;
            if let Some(attribute) = self.key_attributes[event]
                .iter()
                .find(|attribute| !definition.required_attributes().contains(*attribute))
            {
                return Err(EventError::UndeclaredPartitionAttribute {
                    event: event.clone(),
                    attribute: attribute.clone(),
                });
            }
        }
        Ok(())
    }

        /// Resolve the partition key for an event occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MissingPartitionAttribute`] when a configured key
    /// attribute is absent. This cannot happen for attributes that already
    /// passed schema validation against a schema containing the key.
    pub fn resolve(&self, event: &str, attributes: &Attributes) -> EventResult<PartitionKey> {
        let mut hasher = blake3::Hasher::new();

        match self.key_attributes.get(event) {
            Some(keys) if !keys.is_empty() => {
                for key in keys {
                    let value = attributes.get(key).ok_or_else(|| {
                        EventError::MissingPartitionAttribute {
                            event: event.to_owned(),
                            attribute: key.clone(),
                        }
                    })?;
                    serde_json::to_writer(&mut hasher, value)?;
                    hasher.update(VALUE_SEPARATOR);
                }
            },
            _ => {
                for value in attributes.values() {
                    serde_json::to_writer(&mut hasher, value)?;
                    hasher.update(VALUE_SEPARATOR);
                }
            },
        }

        Ok(PartitionKey(*hasher.finalize().as_bytes()))
    }
}
