use chrono::{DateTime, Utc};

/// Fact recorded by an aggregate or entity while it changes state.
///
/// Events sit in the producer's [`DomainEvents`](crate::DomainEvents) buffer until
/// the application layer drains them after persisting the producer.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Name published with the envelope, e.g. `"DoseConfirmada"`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version; bump when a field changes meaning.
    fn version(&self) -> u32 {
        1
    }

    /// Business time of the fact, taken from the injected clock.
    fn occurred_at(&self) -> DateTime<Utc>;
}
