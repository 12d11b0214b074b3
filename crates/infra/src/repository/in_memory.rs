use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use agenda_core::{
    AggregateRoot, DoseLogId, ExpectedVersion, MedicamentoId, PacienteId, Periodo, ShareLinkId,
    TutorId,
};
use agenda_medication::{DoseLog, DoseLogSnapshot, Medicamento, MedicamentoSnapshot};
use agenda_patients::{Paciente, PacienteSnapshot};
use agenda_sharing::{ShareLink, ShareLinkSnapshot};

use super::r#trait::{DoseLogRepository, MedicamentoRepository, PacienteRepository, ShareLinkRepository};
use crate::error::RepositoryError;

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, RepositoryError> {
    lock.read()
        .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, RepositoryError> {
    lock.write()
        .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
}

fn corrupt(kind: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(format!("stored {kind} could not be rebuilt: {err}"))
}

/// Optimistic concurrency check against the stored version (0 when absent).
fn verificar_versao(
    kind: &str,
    id: impl std::fmt::Display,
    expected: ExpectedVersion,
    atual: Option<u64>,
) -> Result<(), RepositoryError> {
    expected
        .check(atual.unwrap_or(0))
        .map_err(|e| RepositoryError::Concurrency(format!("{kind} {id}: {e}")))
}

/// In-memory medication store (snapshots keyed by id).
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMedicamentoRepository {
    inner: RwLock<HashMap<MedicamentoId, MedicamentoSnapshot>>,
}

impl InMemoryMedicamentoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MedicamentoRepository for InMemoryMedicamentoRepository {
    fn salvar(&self, medicamento: &Medicamento, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let mut map = write(&self.inner)?;

        let atual = map.get(medicamento.id()).map(|s| s.version);
        verificar_versao("medicamento", medicamento.id(), expected, atual)?;

        map.insert(medicamento.id().clone(), medicamento.snapshot());
        Ok(())
    }

    fn obter_por_id(&self, id: &MedicamentoId) -> Result<Option<Medicamento>, RepositoryError> {
        let map = read(&self.inner)?;
        map.get(id)
            .map(Medicamento::from_snapshot)
            .transpose()
            .map_err(|e| corrupt("medicamento", e))
    }

    fn listar_por_paciente(&self, paciente_id: &PacienteId) -> Result<Vec<Medicamento>, RepositoryError> {
        let map = read(&self.inner)?;
        let mut medicamentos = map
            .values()
            .filter(|s| &s.paciente_id == paciente_id)
            .map(Medicamento::from_snapshot)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("medicamento", e))?;
        medicamentos.sort_by(|a, b| a.nome().cmp(b.nome()).then_with(|| a.id().cmp(b.id())));
        Ok(medicamentos)
    }
}

/// In-memory dose log store.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDoseLogRepository {
    inner: RwLock<HashMap<DoseLogId, DoseLogSnapshot>>,
}

impl InMemoryDoseLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        read(&self.inner).map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DoseLogRepository for InMemoryDoseLogRepository {
    fn salvar_em_lote(&self, logs: &[(DoseLog, ExpectedVersion)]) -> Result<(), RepositoryError> {
        let mut map = write(&self.inner)?;
        for (log, expected) in logs {
            verificar_versao("dose log", log.id(), *expected, map.get(log.id()).map(|s| s.version))?;
        }
        for (log, _) in logs {
            map.insert(log.id().clone(), log.snapshot());
        }
        Ok(())
    }

    fn listar_por_medicamento_e_periodo(
        &self,
        medicamento_id: &MedicamentoId,
        periodo: &Periodo,
    ) -> Result<Vec<DoseLog>, RepositoryError> {
        let map = read(&self.inner)?;
        let mut logs = map
            .values()
            .filter(|s| &s.medicamento_id == medicamento_id)
            .map(DoseLog::from_snapshot)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("dose log", e))?;
        logs.retain(|log| periodo.contem(log.horario_previsto()));
        logs.sort_by(|a, b| {
            a.horario_previsto()
                .cmp(&b.horario_previsto())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(logs)
    }

    fn obter_por_id(&self, id: &DoseLogId) -> Result<Option<DoseLog>, RepositoryError> {
        let map = read(&self.inner)?;
        map.get(id)
            .map(DoseLog::from_snapshot)
            .transpose()
            .map_err(|e| corrupt("dose log", e))
    }

    fn atualizar_status(&self, log: &DoseLog, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let mut map = write(&self.inner)?;
        let stored = map
            .get_mut(log.id())
            .ok_or_else(|| RepositoryError::Storage(format!("dose log {} does not exist", log.id())))?;
        verificar_versao("dose log", log.id(), expected, Some(stored.version))?;

        stored.status = log.status();
        stored.horario_real = log.horario_real().map(agenda_core::iso8601);
        stored.version = log.version();
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ShareLinkRecord {
    snapshot: ShareLinkSnapshot,
    ultimo_acesso: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct ShareLinkStore {
    links: HashMap<ShareLinkId, ShareLinkRecord>,
    tokens: HashMap<String, ShareLinkId>,
}

impl ShareLinkStore {
    fn por_token(&self, token: &str) -> Option<&ShareLinkRecord> {
        self.tokens.get(token.trim()).and_then(|id| self.links.get(id))
    }

    fn por_token_mut(&mut self, token: &str) -> Option<&mut ShareLinkRecord> {
        let id = self.tokens.get(token.trim())?;
        self.links.get_mut(id)
    }
}

/// In-memory share link store keyed by id, with a unique token index.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryShareLinkRepository {
    inner: RwLock<ShareLinkStore>,
}

impl InMemoryShareLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShareLinkRepository for InMemoryShareLinkRepository {
    fn salvar(&self, link: &ShareLink, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let mut store = write(&self.inner)?;
        let token = link.token().as_str();

        if let Some(owner) = store.tokens.get(token) {
            if owner != link.id() {
                return Err(RepositoryError::Duplicate(format!(
                    "share token already issued to link {owner}"
                )));
            }
        }
        let existente = store.links.get(link.id());
        if let Some(record) = existente {
            if record.snapshot.token != *link.token() {
                return Err(RepositoryError::Duplicate(format!(
                    "share link {} already issued with another token",
                    link.id()
                )));
            }
        }
        verificar_versao(
            "share link",
            link.id(),
            expected,
            existente.map(|r| r.snapshot.version),
        )?;

        let ultimo_acesso = existente.and_then(|r| r.ultimo_acesso);
        store.tokens.insert(token.to_string(), link.id().clone());
        store.links.insert(
            link.id().clone(),
            ShareLinkRecord {
                snapshot: link.snapshot(),
                ultimo_acesso,
            },
        );
        Ok(())
    }

    fn obter_por_token(&self, token: &str) -> Result<Option<ShareLink>, RepositoryError> {
        let store = read(&self.inner)?;
        store
            .por_token(token)
            .map(|r| ShareLink::from_snapshot(&r.snapshot))
            .transpose()
            .map_err(|e| corrupt("share link", e))
    }

    fn registrar_acesso(&self, token: &str, em: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut store = write(&self.inner)?;
        if let Some(record) = store.por_token_mut(token) {
            record.ultimo_acesso = Some(em);
        }
        Ok(())
    }

    fn ultimo_acesso(&self, token: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let store = read(&self.inner)?;
        Ok(store.por_token(token).and_then(|r| r.ultimo_acesso))
    }
}

/// In-memory patient store.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPacienteRepository {
    inner: RwLock<HashMap<PacienteId, PacienteSnapshot>>,
}

impl InMemoryPacienteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PacienteRepository for InMemoryPacienteRepository {
    fn salvar(&self, paciente: &Paciente) -> Result<(), RepositoryError> {
        let mut map = write(&self.inner)?;
        if let Some(existing) = map.get(paciente.id()) {
            if &existing.tutor_id != paciente.tutor_id() {
                return Err(RepositoryError::Duplicate(format!(
                    "paciente {} belongs to another tutor",
                    paciente.id()
                )));
            }
        }
        map.insert(paciente.id().clone(), paciente.snapshot());
        Ok(())
    }

    fn listar_por_tutor(&self, tutor_id: &TutorId) -> Result<Vec<Paciente>, RepositoryError> {
        let map = read(&self.inner)?;
        let mut pacientes = map
            .values()
            .filter(|s| &s.tutor_id == tutor_id)
            .map(Paciente::from_snapshot)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("paciente", e))?;
        pacientes.sort_by(|a, b| {
            a.nome_completo()
                .cmp(b.nome_completo())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(pacientes)
    }

    fn obter_por_id_do_tutor(
        &self,
        tutor_id: &TutorId,
        paciente_id: &PacienteId,
    ) -> Result<Option<Paciente>, RepositoryError> {
        let map = read(&self.inner)?;
        map.get(paciente_id)
            .filter(|s| &s.tutor_id == tutor_id)
            .map(Paciente::from_snapshot)
            .transpose()
            .map_err(|e| corrupt("paciente", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::FixedClock;
    use agenda_medication::{DoseLogProps, DoseStatus, MedicamentoProps, UnidadeDosagem};
    use agenda_patients::PacienteProps;
    use agenda_sharing::{EscopoCompartilhamento, ShareLinkProps, TipoRecursoCompartilhado, TokenShare};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn medicamento(id: &str, nome: &str) -> Medicamento {
        Medicamento::criar(MedicamentoProps {
            id: MedicamentoId::parse(id).unwrap(),
            paciente_id: PacienteId::parse("pac-1").unwrap(),
            nome: nome.to_string(),
            dosagem: 10.0,
            unidade_dosagem: UnidadeDosagem::Ml,
            esquema: None,
            ativo: None,
        })
        .unwrap()
    }

    fn dose(id: &str, horas: i64) -> DoseLog {
        DoseLog::criar(DoseLogProps {
            id: DoseLogId::parse(id).unwrap(),
            medicamento_id: MedicamentoId::parse("med-1").unwrap(),
            horario_previsto: now() + Duration::hours(horas),
            status: None,
            horario_real: None,
        })
    }

    fn link(id: &str, token: &str) -> ShareLink {
        let clock = FixedClock::new(now());
        let mut escopo = EscopoCompartilhamento::criar_vazio();
        escopo.incluir_tudo(TipoRecursoCompartilhado::Medicamento);
        ShareLink::criar(
            ShareLinkProps {
                id: ShareLinkId::parse(id).unwrap(),
                tutor_id: TutorId::parse("tutor-1").unwrap(),
                token: TokenShare::parse(token).unwrap(),
                escopo,
                expiracao: now() + Duration::hours(1),
                criado_em: None,
                revogado: None,
            },
            &clock,
        )
        .unwrap()
    }

    #[test]
    fn medicamento_save_enforces_expected_version() {
        let repo = InMemoryMedicamentoRepository::new();
        let med = medicamento("med-1", "Dipirona");
        repo.salvar(&med, ExpectedVersion::Exact(0)).unwrap();

        let mut stale = repo.obter_por_id(med.id()).unwrap().unwrap();
        let mut fresh = repo.obter_por_id(med.id()).unwrap().unwrap();

        fresh.desativar();
        repo.salvar(&fresh, ExpectedVersion::Exact(0)).unwrap();

        stale.desativar();
        let err = repo.salvar(&stale, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, RepositoryError::Concurrency(_)));
        assert!(err.to_string().contains("medicamento med-1"));
    }

    #[test]
    fn medicamentos_are_listed_per_patient_by_name() {
        let repo = InMemoryMedicamentoRepository::new();
        repo.salvar(&medicamento("med-2", "Vitamina D"), ExpectedVersion::Any).unwrap();
        repo.salvar(&medicamento("med-1", "Amoxicilina"), ExpectedVersion::Any).unwrap();

        let nomes: Vec<String> = repo
            .listar_por_paciente(&PacienteId::parse("pac-1").unwrap())
            .unwrap()
            .iter()
            .map(|m| m.nome().to_string())
            .collect();
        assert_eq!(nomes, ["Amoxicilina", "Vitamina D"]);
        assert!(repo
            .listar_por_paciente(&PacienteId::parse("pac-2").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn deactivation_round_trips_with_version() {
        let repo = InMemoryMedicamentoRepository::new();
        let mut med = medicamento("med-1", "Dipirona");
        repo.salvar(&med, ExpectedVersion::Any).unwrap();
        med.desativar();
        repo.salvar(&med, ExpectedVersion::Exact(0)).unwrap();

        let stored = repo.obter_por_id(med.id()).unwrap().unwrap();
        assert!(!stored.ativo());
        assert_eq!(stored.version(), 1);
    }

    fn novos(logs: Vec<DoseLog>) -> Vec<(DoseLog, ExpectedVersion)> {
        logs.into_iter().map(|d| (d, ExpectedVersion::Exact(0))).collect()
    }

    #[test]
    fn dose_logs_filter_by_period_and_sort() {
        let repo = InMemoryDoseLogRepository::new();
        repo.salvar_em_lote(&novos(vec![dose("d3", 48), dose("d1", 0), dose("d2", 24)]))
            .unwrap();

        let periodo = Periodo::entre(now(), now() + Duration::hours(24)).unwrap();
        let ids: Vec<String> = repo
            .listar_por_medicamento_e_periodo(&MedicamentoId::parse("med-1").unwrap(), &periodo)
            .unwrap()
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        assert_eq!(ids, ["d1", "d2"]);
    }

    #[test]
    fn dose_status_update_requires_existing_log() {
        let repo = InMemoryDoseLogRepository::new();
        let mut log = dose("d1", 0);
        assert!(repo.atualizar_status(&log, ExpectedVersion::Any).is_err());

        repo.salvar_em_lote(&novos(vec![log.clone()])).unwrap();
        log.confirmar_tomada(now()).unwrap();
        repo.atualizar_status(&log, ExpectedVersion::Exact(0)).unwrap();

        let stored = repo.obter_por_id(log.id()).unwrap().unwrap();
        assert_eq!(stored.status(), DoseStatus::Tomado);
        assert_eq!(stored.horario_real(), Some(now()));
        assert_eq!(stored.version(), 1);
    }

    #[test]
    fn stale_dose_writes_are_rejected() {
        let repo = InMemoryDoseLogRepository::new();
        repo.salvar_em_lote(&novos(vec![dose("d1", 0), dose("d2", 1)])).unwrap();

        let mut stale = repo.obter_por_id(&DoseLogId::parse("d1").unwrap()).unwrap().unwrap();
        let mut fresh = stale.clone();
        fresh.confirmar_tomada(now()).unwrap();
        repo.atualizar_status(&fresh, ExpectedVersion::Exact(0)).unwrap();

        stale.marcar_atrasado(now() + Duration::minutes(1)).unwrap();
        let err = repo
            .atualizar_status(&stale, ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Concurrency(_)));

        // One stale entry rejects the whole batch.
        let mut d2 = repo.obter_por_id(&DoseLogId::parse("d2").unwrap()).unwrap().unwrap();
        d2.marcar_atrasado(now() + Duration::hours(2)).unwrap();
        let err = repo
            .salvar_em_lote(&[(d2, ExpectedVersion::Exact(0)), (stale, ExpectedVersion::Exact(0))])
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Concurrency(_)));

        let d1 = repo.obter_por_id(&DoseLogId::parse("d1").unwrap()).unwrap().unwrap();
        assert_eq!(d1.status(), DoseStatus::Tomado);
        let d2 = repo.obter_por_id(&DoseLogId::parse("d2").unwrap()).unwrap().unwrap();
        assert_eq!(d2.status(), DoseStatus::Pendente);
    }

    #[test]
    fn share_tokens_are_unique_per_link() {
        let repo = InMemoryShareLinkRepository::new();
        let token = "abcdefghijklmnopqrstuvwx-1";
        repo.salvar(&link("link-1", token), ExpectedVersion::Exact(0)).unwrap();
        repo.salvar(&link("link-1", token), ExpectedVersion::Exact(0)).unwrap();

        assert!(matches!(
            repo.salvar(&link("link-2", token), ExpectedVersion::Exact(0)),
            Err(RepositoryError::Duplicate(_))
        ));
    }

    #[test]
    fn share_link_id_keeps_its_token() {
        let repo = InMemoryShareLinkRepository::new();
        let token = "abcdefghijklmnopqrstuvwx-1";
        let outro = "abcdefghijklmnopqrstuvwx-2";
        repo.salvar(&link("link-1", token), ExpectedVersion::Exact(0)).unwrap();

        assert!(matches!(
            repo.salvar(&link("link-1", outro), ExpectedVersion::Any),
            Err(RepositoryError::Duplicate(_))
        ));
        assert!(repo.obter_por_token(outro).unwrap().is_none());
        assert!(repo.obter_por_token(token).unwrap().is_some());
    }

    #[test]
    fn share_link_saves_are_version_checked_and_keep_access_stamp() {
        let repo = InMemoryShareLinkRepository::new();
        let token = "abcdefghijklmnopqrstuvwx-1";
        repo.salvar(&link("link-1", token), ExpectedVersion::Exact(0)).unwrap();
        repo.registrar_acesso(token, now()).unwrap();

        let mut stale = repo.obter_por_token(token).unwrap().unwrap();
        let mut revogado = repo.obter_por_token(token).unwrap().unwrap();
        revogado.revogar();
        repo.salvar(&revogado, ExpectedVersion::Exact(0)).unwrap();

        stale
            .renovar(now() + Duration::hours(5), &FixedClock::new(now()))
            .unwrap();
        assert!(matches!(
            repo.salvar(&stale, ExpectedVersion::Exact(0)),
            Err(RepositoryError::Concurrency(_))
        ));

        let stored = repo.obter_por_token(token).unwrap().unwrap();
        assert!(stored.revogado());
        assert_eq!(stored.version(), 1);
        assert_eq!(repo.ultimo_acesso(token).unwrap(), Some(now()));
        assert!(repo.obter_por_token("zzzzzzzzzzzzzzzzzzzzzzzzzz").unwrap().is_none());
    }

    #[test]
    fn pacientes_are_scoped_by_tutor() {
        let repo = InMemoryPacienteRepository::new();
        let paciente = Paciente::criar(PacienteProps {
            id: PacienteId::parse("pac-1").unwrap(),
            tutor_id: TutorId::parse("tutor-1").unwrap(),
            nome_completo: "Ana".into(),
            condicoes: vec![],
            alergias: vec![],
            plano_saude: None,
        })
        .unwrap();
        repo.salvar(&paciente).unwrap();

        let tutor = TutorId::parse("tutor-1").unwrap();
        let outro = TutorId::parse("tutor-2").unwrap();
        assert_eq!(repo.listar_por_tutor(&tutor).unwrap().len(), 1);
        assert!(repo.listar_por_tutor(&outro).unwrap().is_empty());
        assert!(repo.obter_por_id_do_tutor(&outro, paciente.id()).unwrap().is_none());
        assert!(repo.obter_por_id_do_tutor(&tutor, paciente.id()).unwrap().is_some());
    }
}
