//! Event publication port (mechanics only).
//!
//! Publishing happens after the producing aggregate has been persisted and its
//! outbox drained. Where the events go (broker, audit table, log) is up to the
//! implementation; the dosing core only produces and buffers them.

use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::envelope::EventEnvelope;

/// JSON-erased envelope accepted by publishers.
pub type JsonEnvelope = EventEnvelope<JsonValue>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The publisher's internal state is unusable (e.g. lock poisoning).
    #[error("publisher unavailable: {0}")]
    Unavailable(String),

    /// The transport rejected the message.
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Domain-agnostic publisher of drained domain events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, envelope: JsonEnvelope) -> Result<(), PublishError>;

    /// Publish a batch, stopping at the first failure.
    fn publish_all(&self, envelopes: Vec<JsonEnvelope>) -> Result<(), PublishError> {
        for envelope in envelopes {
            self.publish(envelope)?;
        }
        Ok(())
    }
}

impl<P> EventPublisher for Arc<P>
where
    P: EventPublisher + ?Sized,
{
    fn publish(&self, envelope: JsonEnvelope) -> Result<(), PublishError> {
        (**self).publish(envelope)
    }
}

/// In-memory publisher that records every envelope it receives.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    published: Mutex<Vec<JsonEnvelope>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in publication order.
    pub fn published(&self) -> Vec<JsonEnvelope> {
        self.published
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.published()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }
}

impl EventPublisher for InMemoryEventPublisher {
    fn publish(&self, envelope: JsonEnvelope) -> Result<(), PublishError> {
        let mut published = self
            .published
            .lock()
            .map_err(|_| PublishError::Unavailable("lock poisoned".to_string()))?;
        published.push(envelope);
        Ok(())
    }
}

/// Publisher that emits each envelope as a structured `tracing` record.
///
/// Useful as the audit trail when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, envelope: JsonEnvelope) -> Result<(), PublishError> {
        tracing::info!(
            event_id = %envelope.event_id(),
            event_type = envelope.event_type(),
            aggregate_type = envelope.aggregate_type(),
            aggregate_id = envelope.aggregate_id(),
            occurred_at = %envelope.occurred_at(),
            payload = %envelope.payload(),
            "domain event"
        );
        Ok(())
    }
}
