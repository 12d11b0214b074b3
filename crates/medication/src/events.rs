use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenda_core::{DoseLogId, MedicamentoId};
use agenda_events::Event;

use crate::esquema::TipoRecorrencia;

/// Event: EsquemaDeDoseAlterado (a medication's schedule was replaced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsquemaDeDoseAlterado {
    pub medicamento_id: MedicamentoId,
    pub tipo: TipoRecorrencia,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DoseConfirmada (a caregiver confirmed a dose was taken).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseConfirmada {
    pub dose_log_id: DoseLogId,
    pub medicamento_id: MedicamentoId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum MedicationEvent {
    EsquemaDeDoseAlterado(EsquemaDeDoseAlterado),
    DoseConfirmada(DoseConfirmada),
}

impl Event for MedicationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MedicationEvent::EsquemaDeDoseAlterado(_) => "EsquemaDeDoseAlterado",
            MedicationEvent::DoseConfirmada(_) => "DoseConfirmada",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MedicationEvent::EsquemaDeDoseAlterado(e) => e.occurred_at,
            MedicationEvent::DoseConfirmada(e) => e.occurred_at,
        }
    }
}
