use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::Event;

/// Envelope for an event, carrying the stream metadata consumers need.
///
/// Notes:
/// - `aggregate_id` is the UUID of the aggregate the event belongs to.
/// - `sequence_number` is the aggregate version after the committed save, so it
///   is monotonically increasing per aggregate.
/// - `payload` is the domain-agnostic event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    event_type: String,

    aggregate_id: Uuid,
    aggregate_type: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        event_type: impl Into<String>,
        aggregate_id: Uuid,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl EventEnvelope<JsonValue> {
    /// Wrap a typed event as a JSON envelope ready for publication.
    pub fn from_typed<Ev>(
        aggregate_id: Uuid,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        event: &Ev,
    ) -> Result<Self, serde_json::Error>
    where
        Ev: Event + Serialize,
    {
        let payload = serde_json::to_value(event)?;
        Ok(Self::new(
            Uuid::now_v7(),
            event.event_type(),
            aggregate_id,
            aggregate_type,
            sequence_number,
            payload,
        ))
    }
}
