//! Application services (use cases).
//!
//! Every service follows the same pipeline:
//!
//! ```text
//! load aggregate → mutate (domain rules) → save → drain outbox → wrap in envelopes → publish
//! ```
//!
//! Events are drained only after the save succeeded, so a failed write never
//! publishes anything. A publish failure after a successful save is reported as
//! `ServiceError::Publish`; the write itself is not rolled back.

pub mod doses;
pub mod medicamentos;
pub mod pacientes;
pub mod share_links;

pub use doses::{
    ConfirmarTomadaDose, ConfirmarTomadaDoseOutput, GerarDoseLogs, GerarDoseLogsOutput,
    MarcarDosesAtrasadas, MarcarDosesAtrasadasOutput,
};
pub use medicamentos::{AlterarEsquemaDose, AlterarEsquemaDoseOutput, NovoEsquemaDose};
pub use pacientes::ListarPacientesPorTutor;
pub use share_links::{
    AcessarShareLink, AcessarShareLinkInput, AcessarShareLinkOutput, GerarShareLink,
    GerarShareLinkInput, GerarShareLinkOutput, ItemEscopo, RevogarShareLink,
};

use serde::Serialize;

use agenda_events::{Event, EventEnvelope, EventPublisher};

use crate::error::ServiceResult;

/// Wrap drained events and hand them to the publisher, in order.
pub(crate) fn publicar<E>(
    publisher: &dyn EventPublisher,
    aggregate_type: &str,
    aggregate_id: &str,
    eventos: &[E],
) -> ServiceResult<()>
where
    E: Event + Serialize + Clone,
{
    let envelopes = eventos
        .iter()
        .cloned()
        .map(|evento| EventEnvelope::wrap(aggregate_type, aggregate_id, evento).into_json())
        .collect::<Result<Vec<_>, _>>()?;

    let total = envelopes.len();
    publisher.publish_all(envelopes).inspect_err(|e| {
        tracing::warn!(aggregate_type, aggregate_id, error = %e, "event publication failed");
    })?;

    if total > 0 {
        tracing::debug!(aggregate_type, aggregate_id, total, "events published");
    }
    Ok(())
}
