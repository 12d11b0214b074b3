use std::sync::Arc;

use serde::Deserialize;

use agenda_core::{AggregateRoot, Clock, ExpectedVersion, MedicamentoId, Periodo, PeriodoSnapshot};
use agenda_events::EventPublisher;
use agenda_medication::{
    DoseHorario, EsquemaDose, MedicamentoSnapshot, MedicationEvent, TipoRecorrencia,
};

use crate::config::AppConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::repository::MedicamentoRepository;
use crate::services::publicar;

const AGGREGATE_TYPE: &str = "Medicamento";

/// Replacement schedule as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NovoEsquemaDose {
    pub tipo: TipoRecorrencia,
    /// Falls back to the configured default timezone.
    #[serde(default)]
    pub timezone: Option<String>,
    pub horarios: Vec<String>,
    #[serde(default)]
    pub vigencia: Option<PeriodoSnapshot>,
    #[serde(default)]
    pub dias_da_semana: Vec<u8>,
}

impl NovoEsquemaDose {
    fn into_esquema(self, default_timezone: &str) -> ServiceResult<EsquemaDose> {
        let horarios = self
            .horarios
            .iter()
            .map(|h| DoseHorario::parse(h))
            .collect::<Result<Vec<_>, _>>()?;
        let vigencia = self
            .vigencia
            .as_ref()
            .map(Periodo::from_snapshot)
            .transpose()?;
        let timezone = self
            .timezone
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| default_timezone.to_string());

        let esquema = match self.tipo {
            TipoRecorrencia::DiarioHorariosFixos => EsquemaDose::diario(horarios, timezone, vigencia)?,
            TipoRecorrencia::SemanalDiasFixos => {
                EsquemaDose::semanal(horarios, self.dias_da_semana, timezone, vigencia)?
            }
        };
        Ok(esquema)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterarEsquemaDoseOutput {
    pub medicamento: MedicamentoSnapshot,
    pub eventos: Vec<MedicationEvent>,
}

/// Use case: replace a medication's dosing schedule.
pub struct AlterarEsquemaDose {
    medicamentos: Arc<dyn MedicamentoRepository>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    config: AppConfig,
}

impl AlterarEsquemaDose {
    pub fn new(
        medicamentos: Arc<dyn MedicamentoRepository>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        config: AppConfig,
    ) -> Self {
        Self {
            medicamentos,
            clock,
            publisher,
            config,
        }
    }

    #[tracing::instrument(skip(self, esquema), fields(tipo = %esquema.tipo))]
    pub fn execute(
        &self,
        medicamento_id: &str,
        esquema: NovoEsquemaDose,
    ) -> ServiceResult<AlterarEsquemaDoseOutput> {
        let id = MedicamentoId::parse(medicamento_id)?;
        let mut medicamento = self
            .medicamentos
            .obter_por_id(&id)?
            .ok_or_else(ServiceError::not_found)?;

        let novo = esquema.into_esquema(&self.config.default_timezone)?;
        let expected = ExpectedVersion::Exact(medicamento.version());
        medicamento.definir_esquema(novo, self.clock.as_ref())?;

        self.medicamentos.salvar(&medicamento, expected)?;

        let eventos = medicamento.pull_domain_events();
        publicar(self.publisher.as_ref(), AGGREGATE_TYPE, id.as_str(), &eventos)?;

        tracing::info!(medicamento_id = %id, version = medicamento.version(), "dose schedule replaced");
        Ok(AlterarEsquemaDoseOutput {
            medicamento: medicamento.snapshot(),
            eventos,
        })
    }
}
