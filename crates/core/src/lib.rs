//! `agenda-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the medication,
//! sharing and patient modules (no infrastructure concerns).

pub mod aggregate;
pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod periodo;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use clock::{Clock, FixedClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{DoseLogId, MedicamentoId, PacienteId, ShareLinkId, TutorId};
pub use periodo::{Periodo, PeriodoSnapshot};
pub use value_object::ValueObject;

/// Render an instant the way snapshots expose it (ISO-8601, millisecond precision, `Z`).
pub fn iso8601(instant: chrono::DateTime<chrono::Utc>) -> String {
    instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse a snapshot instant (any RFC 3339 offset, normalized to UTC).
pub fn parse_iso8601(raw: &str) -> DomainResult<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| DomainError::validation(format!("invalid instant '{raw}': {e}")))
}
