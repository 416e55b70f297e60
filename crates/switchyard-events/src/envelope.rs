//! Transport envelope and its wire encoding.
//!
//! The wire payload is JSON shaped as
//! `{"event": {"name": ..., "attributes": {...}}, "shouldConsume": bool}`.
//! Topic and partition key travel as transport metadata and are never part of
//! the payload.

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::error::EventResult;
use crate::partition::PartitionKey;

/// One event occurrence as handed to, or received from, the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    event_name: String,
    attributes: Attributes,
    should_consume: bool,
    partition_key: PartitionKey,
}

impl Envelope {
    /// Create an envelope.
    #[must_use]
    pub fn new(
        event_name: impl Into<String>,
        attributes: Attributes,
        should_consume: bool,
        partition_key: PartitionKey,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            attributes,
            should_consume,
            partition_key,
        }
    }

    /// The event name.
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The event attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Whether consumers should dispatch this occurrence.
    ///
    /// Stamped by the producer at publish time.
    #[must_use]
    pub fn should_consume(&self) -> bool {
        self.should_consume
    }

    /// The routing key used by the transport.
    #[must_use]
    pub fn partition_key(&self) -> PartitionKey {
        self.partition_key
    }

    /// Encode the wire payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Codec`](crate::EventError::Codec) if serialization fails.
    pub fn encode(&self) -> EventResult<Vec<u8>> {
        let wire = WirePayloadRef {
            event: WireEventRef {
                name: &self.event_name,
                attributes: &self.attributes,
            },
            should_consume: self.should_consume,
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    /// Decode a wire payload received with `partition_key` as metadata.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Codec`](crate::EventError::Codec) for malformed payloads.
    pub fn decode(payload: &[u8], partition_key: PartitionKey) -> EventResult<Self> {
        let wire: WirePayload = serde_json::from_slice(payload)?;
        Ok(Self {
            event_name: wire.event.name,
            attributes: wire.event.attributes,
            should_consume: wire.should_consume,
            partition_key,
        })
    }

    /// Split into event name and attributes.
    #[must_use]
    pub fn into_parts(self) -> (String, Attributes) {
        (self.event_name, self.attributes)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePayloadRef<'a> {
    event: WireEventRef<'a>,
    should_consume: bool,
}

#[derive(Serialize)]
struct WireEventRef<'a> {
    name: &'a str,
    attributes: &'a Attributes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload {
    event: WireEvent,
    should_consume: bool,
}

#[derive(Deserialize)]
struct WireEvent {
    name: String,
    #[serde(default)]
    attributes: Attributes,
}
