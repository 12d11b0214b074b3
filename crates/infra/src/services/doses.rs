use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use agenda_core::{
    AggregateRoot, Clock, DomainError, DoseLogId, ExpectedVersion, MedicamentoId, Periodo,
};
use agenda_events::EventPublisher;
use agenda_medication::{
    DoseLog, DoseLogProps, DoseLogSnapshot, DoseStatus, Medicamento, MedicationEvent,
};

use crate::config::AppConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::repository::{DoseLogRepository, MedicamentoRepository};
use crate::services::publicar;

const AGGREGATE_TYPE: &str = "DoseLog";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmarTomadaDoseOutput {
    pub status: DoseStatus,
    pub eventos: Vec<MedicationEvent>,
}

/// Use case: confirm that a scheduled dose was taken.
pub struct ConfirmarTomadaDose {
    doses: Arc<dyn DoseLogRepository>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
}

impl ConfirmarTomadaDose {
    pub fn new(
        doses: Arc<dyn DoseLogRepository>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            doses,
            clock,
            publisher,
        }
    }

    /// `instante` defaults to the clock's current instant.
    #[tracing::instrument(skip(self))]
    pub fn execute(
        &self,
        dose_log_id: &str,
        instante: Option<DateTime<Utc>>,
    ) -> ServiceResult<ConfirmarTomadaDoseOutput> {
        let id = DoseLogId::parse(dose_log_id)?;
        let mut dose = self
            .doses
            .obter_por_id(&id)?
            .ok_or_else(ServiceError::not_found)?;

        let agora = instante.unwrap_or_else(|| self.clock.now_utc());
        let expected = ExpectedVersion::Exact(dose.version());
        dose.confirmar_tomada(agora)?;

        self.doses.atualizar_status(&dose, expected)?;

        let eventos = dose.pull_domain_events();
        publicar(self.publisher.as_ref(), AGGREGATE_TYPE, id.as_str(), &eventos)?;

        tracing::info!(dose_log_id = %id, status = %dose.status(), "dose confirmed");
        Ok(ConfirmarTomadaDoseOutput {
            status: dose.status(),
            eventos,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarcarDosesAtrasadasOutput {
    pub marcadas: Vec<DoseLogId>,
}

/// Use case: flag every overdue pending dose of a medication as late.
pub struct MarcarDosesAtrasadas {
    doses: Arc<dyn DoseLogRepository>,
    clock: Arc<dyn Clock>,
}

impl MarcarDosesAtrasadas {
    pub fn new(doses: Arc<dyn DoseLogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { doses, clock }
    }

    /// Marks pending doses scheduled inside `periodo` and strictly before now.
    #[tracing::instrument(skip(self, periodo))]
    pub fn execute(
        &self,
        medicamento_id: &str,
        periodo: &Periodo,
    ) -> ServiceResult<MarcarDosesAtrasadasOutput> {
        let id = MedicamentoId::parse(medicamento_id)?;
        let agora = self.clock.now_utc();

        let mut atrasadas = Vec::new();
        for mut dose in self.doses.listar_por_medicamento_e_periodo(&id, periodo)? {
            if dose.status() == DoseStatus::Pendente && dose.horario_previsto() < agora {
                let expected = ExpectedVersion::Exact(dose.version());
                dose.marcar_atrasado(agora)?;
                atrasadas.push((dose, expected));
            }
        }

        if !atrasadas.is_empty() {
            self.doses.salvar_em_lote(&atrasadas)?;
            tracing::info!(medicamento_id = %id, total = atrasadas.len(), "doses marked late");
        }

        Ok(MarcarDosesAtrasadasOutput {
            marcadas: atrasadas.iter().map(|(d, _)| d.id().clone()).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerarDoseLogsOutput {
    /// Logs created by this call, oldest first.
    pub criados: Vec<DoseLogSnapshot>,
    /// Projected occurrences that already had a log.
    pub existentes: usize,
}

/// Use case: materialize pending dose logs from a medication's schedule.
///
/// Log ids are derived from the medication id and the projected instant, so
/// running the generator again over an overlapping window creates nothing twice.
pub struct GerarDoseLogs {
    medicamentos: Arc<dyn MedicamentoRepository>,
    doses: Arc<dyn DoseLogRepository>,
    clock: Arc<dyn Clock>,
    config: AppConfig,
}

impl GerarDoseLogs {
    pub fn new(
        medicamentos: Arc<dyn MedicamentoRepository>,
        doses: Arc<dyn DoseLogRepository>,
        clock: Arc<dyn Clock>,
        config: AppConfig,
    ) -> Self {
        Self {
            medicamentos,
            doses,
            clock,
            config,
        }
    }

    /// Deterministic id of the log for `medicamento_id` at `instante`.
    pub fn dose_log_id(medicamento_id: &MedicamentoId, instante: DateTime<Utc>) -> ServiceResult<DoseLogId> {
        Ok(DoseLogId::parse(&format!(
            "{medicamento_id}:{}",
            instante.timestamp_millis()
        ))?)
    }

    /// `periodo` defaults to `[now, now + dose_log_horizon_days]`.
    #[tracing::instrument(skip(self, periodo))]
    pub fn execute(
        &self,
        medicamento_id: &str,
        periodo: Option<Periodo>,
    ) -> ServiceResult<GerarDoseLogsOutput> {
        let id = MedicamentoId::parse(medicamento_id)?;
        let medicamento = self
            .medicamentos
            .obter_por_id(&id)?
            .ok_or_else(ServiceError::not_found)?;
        if !medicamento.ativo() {
            return Err(DomainError::invariant("cannot generate doses for an inactive medication").into());
        }

        let periodo = match periodo {
            Some(periodo) => periodo,
            None => self.janela_padrao()?,
        };

        self.gerar(&medicamento, &periodo)
    }

    fn janela_padrao(&self) -> ServiceResult<Periodo> {
        let agora = self.clock.now_utc();
        let horizonte = Duration::days(i64::from(self.config.dose_log_horizon_days));
        Ok(Periodo::entre(agora, agora + horizonte)?)
    }

    fn gerar(&self, medicamento: &Medicamento, periodo: &Periodo) -> ServiceResult<GerarDoseLogsOutput> {
        let medicamento_id = medicamento.id();
        let projecoes = medicamento.gerar_projecoes_de_dose(periodo, self.clock.as_ref())?;

        let mut vistos: HashSet<DoseLogId> = self
            .doses
            .listar_por_medicamento_e_periodo(medicamento_id, periodo)?
            .into_iter()
            .map(|d| d.id().clone())
            .collect();

        let mut novos = Vec::new();
        let mut repetidos = 0;
        for projecao in projecoes {
            let id = Self::dose_log_id(medicamento_id, projecao.horario_previsto)?;
            if !vistos.insert(id.clone()) {
                repetidos += 1;
                continue;
            }
            novos.push(DoseLog::criar(DoseLogProps {
                id,
                medicamento_id: medicamento_id.clone(),
                horario_previsto: projecao.horario_previsto,
                status: None,
                horario_real: None,
            }));
        }

        if !novos.is_empty() {
            let lote: Vec<_> = novos
                .iter()
                .map(|d| (d.clone(), ExpectedVersion::Exact(0)))
                .collect();
            self.doses.salvar_em_lote(&lote)?;
        }
        tracing::info!(
            medicamento_id = %medicamento_id,
            criados = novos.len(),
            existentes = repetidos,
            "dose logs generated"
        );

        Ok(GerarDoseLogsOutput {
            criados: novos.iter().map(DoseLog::snapshot).collect(),
            existentes: repetidos,
        })
    }
}
