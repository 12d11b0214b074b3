//! Domain events: the `Event` contract, the per-aggregate outbox buffer and the
//! publication port used by application services once a write has succeeded.

pub mod envelope;
pub mod event;
pub mod outbox;
pub mod publisher;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use outbox::DomainEvents;
pub use publisher::{EventPublisher, InMemoryEventPublisher, JsonEnvelope, PublishError, TracingEventPublisher};
