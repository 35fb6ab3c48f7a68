//! Envelopes put on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tillstock_core::AggregateRoot;

use crate::event::Event;

/// Routing data copied out of the payload so consumers can filter without
/// knowing the payload type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Time-ordered (v7) so ids sort in publication order.
    pub event_id: Uuid,
    /// Aggregate kind, e.g. `"delivery"`.
    pub stream: String,
    pub stream_id: u64,
    /// Aggregate version once this event is applied; the first event of a
    /// stream is 1.
    pub sequence: u64,
    pub event_type: String,
    pub schema_version: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    #[serde(flatten)]
    header: EventHeader,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    pub fn wrap(stream: impl Into<String>, stream_id: u64, sequence: u64, payload: E) -> Self {
        Self {
            header: EventHeader {
                event_id: Uuid::now_v7(),
                stream: stream.into(),
                stream_id,
                sequence,
                event_type: payload.event_type().to_string(),
                schema_version: payload.version(),
                occurred_at: payload.occurred_at(),
            },
            payload,
        }
    }

    /// Envelopes for a batch of events emitted by one aggregate of kind `A`
    /// that stood at `from_version` before the batch.
    pub fn for_aggregate<A: AggregateRoot>(
        stream_id: u64,
        from_version: u64,
        events: impl IntoIterator<Item = E>,
    ) -> Vec<Self> {
        (from_version + 1..)
            .zip(events)
            .map(|(sequence, event)| Self::wrap(A::KIND, stream_id, sequence, event))
            .collect()
    }
}

impl<E> EventEnvelope<E> {
    pub fn header(&self) -> &EventHeader {
        &self.header
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

impl<E: Serialize> EventEnvelope<E> {
    /// Same envelope with the payload turned into JSON, for a bus that
    /// carries several event types.
    pub fn encode(&self) -> Result<EventEnvelope<serde_json::Value>, serde_json::Error> {
        Ok(EventEnvelope {
            header: self.header.clone(),
            payload: serde_json::to_value(&self.payload)?,
        })
    }
}
