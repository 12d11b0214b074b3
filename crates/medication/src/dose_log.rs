//! `DoseLog`: one concrete scheduled dose occurrence and its confirmation lifecycle.
//!
//! The lifecycle is an explicit state table: [`DoseStatus::transicionar`] is a pure
//! function from `(status, command, horario_previsto)` to the next status plus its
//! effects, and the entity only applies what the table decides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenda_core::{DomainError, DomainResult, DoseLogId, Entity, MedicamentoId};
use agenda_events::DomainEvents;

use crate::events::{DoseConfirmada, MedicationEvent};

/// Confirmation status of a dose occurrence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DoseStatus {
    Pendente,
    Tomado,
    Atrasado,
}

impl DoseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendente => "PENDENTE",
            Self::Tomado => "TOMADO",
            Self::Atrasado => "ATRASADO",
        }
    }
}

impl core::fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DoseStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PENDENTE" => Ok(Self::Pendente),
            "TOMADO" => Ok(Self::Tomado),
            "ATRASADO" => Ok(Self::Atrasado),
            other => Err(DomainError::validation(format!("unknown dose status: {other}"))),
        }
    }
}

/// Input of the dose state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComandoDose {
    ConfirmarTomada { agora: DateTime<Utc> },
    MarcarAtrasado { agora: DateTime<Utc> },
    ReverterParaPendente,
}

/// What a transition does to `horario_real`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EfeitoHorarioReal {
    Manter,
    Definir(DateTime<Utc>),
    Limpar,
}

/// Output of the dose state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transicao {
    pub proximo: DoseStatus,
    pub horario_real: EfeitoHorarioReal,
    /// Whether a `DoseConfirmada` event must be raised.
    pub evento: bool,
}

impl Transicao {
    fn permanece(status: DoseStatus) -> Self {
        Self {
            proximo: status,
            horario_real: EfeitoHorarioReal::Manter,
            evento: false,
        }
    }
}

impl DoseStatus {
    /// The dose state table.
    ///
    /// | from \ command | confirmar (agora)             | marcar atrasado (agora)      | reverter            |
    /// |----------------|-------------------------------|------------------------------|---------------------|
    /// | Pendente       | Tomado if agora >= previsto   | Atrasado if agora > previsto | no-op               |
    /// | Tomado         | no-op                         | error                        | Pendente, clear     |
    /// | Atrasado       | error                         | no-op                        | Pendente, clear     |
    pub fn transicionar(
        self,
        comando: ComandoDose,
        horario_previsto: DateTime<Utc>,
    ) -> DomainResult<Transicao> {
        use ComandoDose::*;
        use DoseStatus::*;

        match (self, comando) {
            (Pendente, ConfirmarTomada { agora }) => {
                if agora < horario_previsto {
                    return Err(DomainError::invariant(
                        "cannot confirm a dose before its scheduled time",
                    ));
                }
                Ok(Transicao {
                    proximo: Tomado,
                    horario_real: EfeitoHorarioReal::Definir(agora),
                    evento: true,
                })
            }
            (Pendente, MarcarAtrasado { agora }) => {
                if agora <= horario_previsto {
                    return Err(DomainError::invariant(
                        "a dose can only be marked late after its scheduled time",
                    ));
                }
                Ok(Transicao {
                    proximo: Atrasado,
                    horario_real: EfeitoHorarioReal::Definir(agora),
                    evento: false,
                })
            }
            (Pendente, ReverterParaPendente) => Ok(Transicao::permanece(Pendente)),

            (Tomado, ConfirmarTomada { .. }) => Ok(Transicao::permanece(Tomado)),
            (Tomado, MarcarAtrasado { .. }) => Err(DomainError::invariant(
                "cannot mark a taken dose as late",
            )),

            (Atrasado, ConfirmarTomada { .. }) => Err(DomainError::invariant(
                "a late dose already holds its real timestamp",
            )),
            (Atrasado, MarcarAtrasado { .. }) => Ok(Transicao::permanece(Atrasado)),

            (Tomado | Atrasado, ReverterParaPendente) => Ok(Transicao {
                proximo: Pendente,
                horario_real: EfeitoHorarioReal::Limpar,
                evento: false,
            }),
        }
    }
}

/// Construction input for [`DoseLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseLogProps {
    pub id: DoseLogId,
    pub medicamento_id: MedicamentoId,
    pub horario_previsto: DateTime<Utc>,
    pub status: Option<DoseStatus>,
    pub horario_real: Option<DateTime<Utc>>,
}

/// Serialized shape of a [`DoseLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseLogSnapshot {
    pub id: DoseLogId,
    pub medicamento_id: MedicamentoId,
    pub horario_previsto: String,
    pub status: DoseStatus,
    pub horario_real: Option<String>,
    #[serde(default)]
    pub version: u64,
}

/// Entity: one scheduled dose occurrence of one medication.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseLog {
    id: DoseLogId,
    medicamento_id: MedicamentoId,
    horario_previsto: DateTime<Utc>,
    status: DoseStatus,
    horario_real: Option<DateTime<Utc>>,
    version: u64,
    events: DomainEvents<MedicationEvent>,
}

impl DoseLog {
    /// Create (or rehydrate) a dose occurrence; status defaults to `Pendente`.
    pub fn criar(props: DoseLogProps) -> Self {
        Self {
            id: props.id,
            medicamento_id: props.medicamento_id,
            horario_previsto: props.horario_previsto,
            status: props.status.unwrap_or(DoseStatus::Pendente),
            horario_real: props.horario_real,
            version: 0,
            events: DomainEvents::new(),
        }
    }

    /// Rehydrate from storage, restoring the version.
    pub fn from_snapshot(snapshot: &DoseLogSnapshot) -> DomainResult<Self> {
        let mut log = Self::criar(DoseLogProps {
            id: snapshot.id.clone(),
            medicamento_id: snapshot.medicamento_id.clone(),
            horario_previsto: agenda_core::parse_iso8601(&snapshot.horario_previsto)?,
            status: Some(snapshot.status),
            horario_real: snapshot.horario_real.as_deref().map(agenda_core::parse_iso8601).transpose()?,
        });
        log.version = snapshot.version;
        Ok(log)
    }

    pub fn confirmar_tomada(&mut self, agora: DateTime<Utc>) -> DomainResult<()> {
        self.aplicar(ComandoDose::ConfirmarTomada { agora })
    }

    pub fn marcar_atrasado(&mut self, agora: DateTime<Utc>) -> DomainResult<()> {
        self.aplicar(ComandoDose::MarcarAtrasado { agora })
    }

    pub fn reverter_para_pendente(&mut self) -> DomainResult<()> {
        self.aplicar(ComandoDose::ReverterParaPendente)
    }

    fn aplicar(&mut self, comando: ComandoDose) -> DomainResult<()> {
        let transicao = self.status.transicionar(comando, self.horario_previsto)?;
        let altera = transicao.proximo != self.status
            || transicao.horario_real != EfeitoHorarioReal::Manter;

        match transicao.horario_real {
            EfeitoHorarioReal::Manter => {}
            EfeitoHorarioReal::Definir(instante) => self.horario_real = Some(instante),
            EfeitoHorarioReal::Limpar => self.horario_real = None,
        }
        if transicao.evento {
            if let ComandoDose::ConfirmarTomada { agora } = comando {
                self.events.record(MedicationEvent::DoseConfirmada(DoseConfirmada {
                    dose_log_id: self.id.clone(),
                    medicamento_id: self.medicamento_id.clone(),
                    occurred_at: agora,
                }));
            }
        }
        self.status = transicao.proximo;
        if altera {
            self.version += 1;
        }
        Ok(())
    }

    pub fn id(&self) -> &DoseLogId {
        &self.id
    }

    pub fn medicamento_id(&self) -> &MedicamentoId {
        &self.medicamento_id
    }

    pub fn horario_previsto(&self) -> DateTime<Utc> {
        self.horario_previsto
    }

    pub fn horario_real(&self) -> Option<DateTime<Utc>> {
        self.horario_real
    }

    pub fn status(&self) -> DoseStatus {
        self.status
    }

    /// Incremented once per transition that changes the stored state; no-ops keep it.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Drain buffered domain events (second call returns nothing).
    pub fn pull_domain_events(&mut self) -> Vec<MedicationEvent> {
        self.events.pull()
    }

    pub fn snapshot(&self) -> DoseLogSnapshot {
        DoseLogSnapshot {
            id: self.id.clone(),
            medicamento_id: self.medicamento_id.clone(),
            horario_previsto: agenda_core::iso8601(self.horario_previsto),
            status: self.status,
            horario_real: self.horario_real.map(agenda_core::iso8601),
            version: self.version,
        }
    }
}

impl Entity for DoseLog {
    type Id = DoseLogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn previsto() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn dose(status: DoseStatus) -> DoseLog {
        DoseLog::criar(DoseLogProps {
            id: DoseLogId::parse("dose-1").unwrap(),
            medicamento_id: MedicamentoId::parse("med-1").unwrap(),
            horario_previsto: previsto(),
            status: Some(status),
            horario_real: None,
        })
    }

    #[test]
    fn confirming_before_schedule_fails_and_after_succeeds() {
        let mut log = dose(DoseStatus::Pendente);

        let err = log.confirmar_tomada(previsto() - Duration::minutes(1)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(log.status(), DoseStatus::Pendente);
        assert_eq!(log.horario_real(), None);

        let agora = previsto() + Duration::minutes(1);
        log.confirmar_tomada(agora).unwrap();

        assert_eq!(log.status(), DoseStatus::Tomado);
        assert_eq!(log.horario_real(), Some(agora));
        let events = log.pull_domain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            MedicationEvent::DoseConfirmada(e) => {
                assert_eq!(e.dose_log_id.as_str(), "dose-1");
                assert_eq!(e.medicamento_id.as_str(), "med-1");
                assert_eq!(e.occurred_at, agora);
            }
            other => panic!("expected DoseConfirmada, got {other:?}"),
        }
        assert!(log.pull_domain_events().is_empty());
    }

    #[test]
    fn confirming_exactly_on_schedule_is_allowed() {
        let mut log = dose(DoseStatus::Pendente);
        log.confirmar_tomada(previsto()).unwrap();
        assert_eq!(log.status(), DoseStatus::Tomado);
    }

    #[test]
    fn confirming_twice_is_idempotent() {
        let mut log = dose(DoseStatus::Pendente);
        let primeira = previsto() + Duration::minutes(5);
        log.confirmar_tomada(primeira).unwrap();
        log.confirmar_tomada(primeira + Duration::hours(1)).unwrap();

        assert_eq!(log.status(), DoseStatus::Tomado);
        assert_eq!(log.horario_real(), Some(primeira));
        assert_eq!(log.pull_domain_events().len(), 1);
    }

    #[test]
    fn late_dose_cannot_be_confirmed() {
        let mut log = dose(DoseStatus::Atrasado);
        assert!(matches!(
            log.confirmar_tomada(previsto() + Duration::hours(2)),
            Err(DomainError::InvariantViolation(_))
        ));
        assert!(log.pull_domain_events().is_empty());
    }

    #[test]
    fn marking_late_requires_strictly_after_schedule() {
        let mut log = dose(DoseStatus::Pendente);
        assert!(log.marcar_atrasado(previsto()).is_err());

        let agora = previsto() + Duration::seconds(1);
        log.marcar_atrasado(agora).unwrap();
        assert_eq!(log.status(), DoseStatus::Atrasado);
        assert_eq!(log.horario_real(), Some(agora));
        assert!(log.pull_domain_events().is_empty());

        // Already late: no-op, timestamp untouched.
        log.marcar_atrasado(agora + Duration::hours(1)).unwrap();
        assert_eq!(log.horario_real(), Some(agora));
    }

    #[test]
    fn taken_dose_cannot_be_marked_late() {
        let mut log = dose(DoseStatus::Tomado);
        assert!(matches!(
            log.marcar_atrasado(previsto() + Duration::hours(1)),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn revert_clears_real_timestamp() {
        let mut log = dose(DoseStatus::Pendente);
        log.confirmar_tomada(previsto()).unwrap();
        log.reverter_para_pendente().unwrap();
        assert_eq!(log.status(), DoseStatus::Pendente);
        assert_eq!(log.horario_real(), None);

        log.marcar_atrasado(previsto() + Duration::minutes(30)).unwrap();
        log.reverter_para_pendente().unwrap();
        assert_eq!(log.status(), DoseStatus::Pendente);
        assert_eq!(log.horario_real(), None);

        // Pendente: no-op.
        log.reverter_para_pendente().unwrap();
        assert_eq!(log.status(), DoseStatus::Pendente);
    }

    #[test]
    fn reconfirming_after_revert_emits_a_new_event() {
        let mut log = dose(DoseStatus::Pendente);
        log.confirmar_tomada(previsto()).unwrap();
        log.reverter_para_pendente().unwrap();
        log.confirmar_tomada(previsto() + Duration::minutes(10)).unwrap();
        assert_eq!(log.pull_domain_events().len(), 2);
    }

    #[test]
    fn transition_table_is_pure() {
        let agora = previsto() + Duration::minutes(1);
        let t = DoseStatus::Pendente
            .transicionar(ComandoDose::ConfirmarTomada { agora }, previsto())
            .unwrap();
        assert_eq!(
            t,
            Transicao {
                proximo: DoseStatus::Tomado,
                horario_real: EfeitoHorarioReal::Definir(agora),
                evento: true,
            }
        );
        let t = DoseStatus::Atrasado
            .transicionar(ComandoDose::ReverterParaPendente, previsto())
            .unwrap();
        assert_eq!(t.proximo, DoseStatus::Pendente);
        assert_eq!(t.horario_real, EfeitoHorarioReal::Limpar);
    }

    #[test]
    fn snapshot_uses_uppercase_status_and_iso_strings() {
        let mut log = dose(DoseStatus::Pendente);
        log.confirmar_tomada(previsto() + Duration::minutes(1)).unwrap();

        let snapshot = log.snapshot();
        assert_eq!(snapshot.horario_previsto, "2024-01-01T08:00:00.000Z");
        assert_eq!(snapshot.horario_real.as_deref(), Some("2024-01-01T08:01:00.000Z"));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "TOMADO");

        let rebuilt = DoseLog::from_snapshot(&snapshot).unwrap();
        assert_eq!(rebuilt.status(), DoseStatus::Tomado);
        assert_eq!(rebuilt.horario_real(), log.horario_real());
    }

    #[test]
    fn entity_identity_is_the_log_id() {
        fn entity_id<E: Entity>(e: &E) -> E::Id {
            e.id().clone()
        }
        let log = dose(DoseStatus::Pendente);
        assert_eq!(entity_id(&log), DoseLogId::parse("dose-1").unwrap());
    }

    #[test]
    fn version_counts_effective_transitions_only() {
        let mut log = dose(DoseStatus::Pendente);
        assert_eq!(log.version(), 0);

        log.reverter_para_pendente().unwrap();
        assert_eq!(log.version(), 0);

        log.confirmar_tomada(previsto()).unwrap();
        assert_eq!(log.version(), 1);
        log.confirmar_tomada(previsto() + Duration::minutes(5)).unwrap();
        assert_eq!(log.version(), 1);

        log.reverter_para_pendente().unwrap();
        assert_eq!(log.version(), 2);

        let rebuilt = DoseLog::from_snapshot(&log.snapshot()).unwrap();
        assert_eq!(rebuilt.version(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: confirmation before the schedule always fails, at or after succeeds,
        /// and a second confirmation never changes the outcome.
        #[test]
        fn confirmation_threshold_and_idempotence(delta in -100_000i64..100_000, extra in 0i64..100_000) {
            let mut log = dose(DoseStatus::Pendente);
            let agora = previsto() + Duration::seconds(delta);

            let result = log.confirmar_tomada(agora);
            if delta < 0 {
                prop_assert!(result.is_err());
                prop_assert_eq!(log.status(), DoseStatus::Pendente);
            } else {
                prop_assert!(result.is_ok());
                prop_assert!(log.confirmar_tomada(agora + Duration::seconds(extra)).is_ok());
                prop_assert_eq!(log.status(), DoseStatus::Tomado);
                prop_assert_eq!(log.horario_real(), Some(agora));
            }
        }

        /// Property: marking late at or before the schedule always fails.
        #[test]
        fn late_marking_threshold(delta in -100_000i64..100_000) {
            let mut log = dose(DoseStatus::Pendente);
            let result = log.marcar_atrasado(previsto() + Duration::seconds(delta));
            prop_assert_eq!(result.is_ok(), delta > 0);
        }
    }
}
