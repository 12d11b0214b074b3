//! `Medicamento` aggregate: a patient's medication and the schedule it owns.

use serde::{Deserialize, Serialize};

use agenda_core::{
    AggregateRoot, Clock, DomainError, DomainResult, MedicamentoId, PacienteId, Periodo,
};
use agenda_events::DomainEvents;

use crate::esquema::{DoseProjecao, EsquemaDose, EsquemaDoseSnapshot};
use crate::events::{EsquemaDeDoseAlterado, MedicationEvent};
use crate::unidade::UnidadeDosagem;

/// Construction input for [`Medicamento::criar`].
#[derive(Debug, Clone, PartialEq)]
pub struct MedicamentoProps {
    pub id: MedicamentoId,
    pub paciente_id: PacienteId,
    pub nome: String,
    pub dosagem: f64,
    pub unidade_dosagem: UnidadeDosagem,
    pub esquema: Option<EsquemaDose>,
    /// Defaults to `true`.
    pub ativo: Option<bool>,
}

/// Serialized shape of a [`Medicamento`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicamentoSnapshot {
    pub id: MedicamentoId,
    pub paciente_id: PacienteId,
    pub nome: String,
    pub dosagem: f64,
    pub unidade_dosagem: UnidadeDosagem,
    pub esquema: Option<EsquemaDoseSnapshot>,
    pub ativo: bool,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Medicamento {
    id: MedicamentoId,
    paciente_id: PacienteId,
    nome: String,
    dosagem: f64,
    unidade_dosagem: UnidadeDosagem,
    esquema: Option<EsquemaDose>,
    ativo: bool,
    version: u64,
    events: DomainEvents<MedicationEvent>,
}

impl Medicamento {
    pub fn criar(props: MedicamentoProps) -> DomainResult<Self> {
        let nome = props.nome.trim();
        if nome.is_empty() {
            return Err(DomainError::validation("medication name cannot be empty"));
        }
        if !props.dosagem.is_finite() || props.dosagem <= 0.0 {
            return Err(DomainError::validation(
                "medication dosage must be a positive number",
            ));
        }

        Ok(Self {
            id: props.id,
            paciente_id: props.paciente_id,
            nome: nome.to_string(),
            dosagem: props.dosagem,
            unidade_dosagem: props.unidade_dosagem,
            esquema: props.esquema,
            ativo: props.ativo.unwrap_or(true),
            version: 0,
            events: DomainEvents::new(),
        })
    }

    /// Rehydrate from storage; re-runs construction validation and restores the version.
    pub fn from_snapshot(snapshot: &MedicamentoSnapshot) -> DomainResult<Self> {
        let esquema = snapshot
            .esquema
            .as_ref()
            .map(EsquemaDose::from_snapshot)
            .transpose()?;
        let mut medicamento = Self::criar(MedicamentoProps {
            id: snapshot.id.clone(),
            paciente_id: snapshot.paciente_id.clone(),
            nome: snapshot.nome.clone(),
            dosagem: snapshot.dosagem,
            unidade_dosagem: snapshot.unidade_dosagem,
            esquema,
            ativo: Some(snapshot.ativo),
        })?;
        medicamento.version = snapshot.version;
        Ok(medicamento)
    }

    /// Replace the schedule wholesale; only allowed while the medication is active.
    pub fn definir_esquema(&mut self, novo: EsquemaDose, clock: &dyn Clock) -> DomainResult<()> {
        if !self.ativo {
            return Err(DomainError::invariant(
                "cannot change the schedule of an inactive medication",
            ));
        }

        let tipo = novo.tipo();
        self.esquema = Some(novo);
        self.version += 1;
        self.events
            .record(MedicationEvent::EsquemaDeDoseAlterado(EsquemaDeDoseAlterado {
                medicamento_id: self.id.clone(),
                tipo,
                occurred_at: clock.now_utc(),
            }));
        Ok(())
    }

    /// Project dose occurrences over `periodo`; no schedule means no doses.
    pub fn gerar_projecoes_de_dose(
        &self,
        periodo: &Periodo,
        clock: &dyn Clock,
    ) -> DomainResult<Vec<DoseProjecao>> {
        match &self.esquema {
            Some(esquema) => esquema.projetar_instancias(periodo, clock),
            None => Ok(Vec::new()),
        }
    }

    pub fn desativar(&mut self) {
        self.ativo = false;
        self.version += 1;
    }

    pub fn reativar(&mut self) {
        self.ativo = true;
        self.version += 1;
    }

    pub fn paciente_id(&self) -> &PacienteId {
        &self.paciente_id
    }

    pub fn nome(&self) -> &str {
        &self.nome
    }

    pub fn dosagem(&self) -> f64 {
        self.dosagem
    }

    pub fn unidade_dosagem(&self) -> UnidadeDosagem {
        self.unidade_dosagem
    }

    pub fn esquema(&self) -> Option<&EsquemaDose> {
        self.esquema.as_ref()
    }

    pub fn ativo(&self) -> bool {
        self.ativo
    }

    pub fn pull_domain_events(&mut self) -> Vec<MedicationEvent> {
        self.events.pull()
    }

    pub fn snapshot(&self) -> MedicamentoSnapshot {
        MedicamentoSnapshot {
            id: self.id.clone(),
            paciente_id: self.paciente_id.clone(),
            nome: self.nome.clone(),
            dosagem: self.dosagem,
            unidade_dosagem: self.unidade_dosagem,
            esquema: self.esquema.as_ref().map(EsquemaDose::snapshot),
            ativo: self.ativo,
            version: self.version,
        }
    }
}

impl AggregateRoot for Medicamento {
    type Id = MedicamentoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
