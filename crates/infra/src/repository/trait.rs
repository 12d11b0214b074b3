use chrono::{DateTime, Utc};

use agenda_core::{DoseLogId, ExpectedVersion, MedicamentoId, PacienteId, Periodo, TutorId};
use agenda_medication::{DoseLog, Medicamento};
use agenda_patients::Paciente;
use agenda_sharing::ShareLink;

use crate::error::RepositoryError;

/// Storage of [`Medicamento`] aggregates.
///
/// `salvar` enforces optimistic concurrency: `expected` must match the version
/// currently stored (0 when the medication was never saved).
pub trait MedicamentoRepository: Send + Sync {
    fn salvar(&self, medicamento: &Medicamento, expected: ExpectedVersion) -> Result<(), RepositoryError>;

    fn obter_por_id(&self, id: &MedicamentoId) -> Result<Option<Medicamento>, RepositoryError>;

    fn listar_por_paciente(&self, paciente_id: &PacienteId) -> Result<Vec<Medicamento>, RepositoryError>;
}

/// Storage of [`DoseLog`] entities.
///
/// Writes carry the version the caller loaded (0 for a log never stored); a
/// mismatch is a `Concurrency` error and nothing is written.
pub trait DoseLogRepository: Send + Sync {
    /// Insert or replace every log in one atomic step; all versions are checked first.
    fn salvar_em_lote(&self, logs: &[(DoseLog, ExpectedVersion)]) -> Result<(), RepositoryError>;

    /// Logs of one medication whose scheduled instant lies in `periodo`, oldest first.
    fn listar_por_medicamento_e_periodo(
        &self,
        medicamento_id: &MedicamentoId,
        periodo: &Periodo,
    ) -> Result<Vec<DoseLog>, RepositoryError>;

    fn obter_por_id(&self, id: &DoseLogId) -> Result<Option<DoseLog>, RepositoryError>;

    /// Persist the status of an existing log.
    fn atualizar_status(&self, log: &DoseLog, expected: ExpectedVersion) -> Result<(), RepositoryError>;
}

/// Storage of [`ShareLink`] aggregates, addressed by token.
pub trait ShareLinkRepository: Send + Sync {
    /// Insert or replace, checking `expected` against the stored version.
    ///
    /// A token owned by another link, or a known id saved under a different
    /// token, is a `Duplicate`.
    fn salvar(&self, link: &ShareLink, expected: ExpectedVersion) -> Result<(), RepositoryError>;

    fn obter_por_token(&self, token: &str) -> Result<Option<ShareLink>, RepositoryError>;

    /// Stamp the last access instant; unknown tokens are ignored.
    fn registrar_acesso(&self, token: &str, em: DateTime<Utc>) -> Result<(), RepositoryError>;

    fn ultimo_acesso(&self, token: &str) -> Result<Option<DateTime<Utc>>, RepositoryError>;
}

/// Storage of [`Paciente`] records, always scoped by tutor.
pub trait PacienteRepository: Send + Sync {
    fn salvar(&self, paciente: &Paciente) -> Result<(), RepositoryError>;

    /// Patients of one tutor ordered by name.
    fn listar_por_tutor(&self, tutor_id: &TutorId) -> Result<Vec<Paciente>, RepositoryError>;

    /// A patient only when it belongs to `tutor_id`.
    fn obter_por_id_do_tutor(
        &self,
        tutor_id: &TutorId,
        paciente_id: &PacienteId,
    ) -> Result<Option<Paciente>, RepositoryError>;
}
