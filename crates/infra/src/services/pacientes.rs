use std::sync::Arc;

use agenda_core::TutorId;
use agenda_patients::PacienteSnapshot;

use crate::error::ServiceResult;
use crate::repository::PacienteRepository;

/// Use case: list a tutor's patients.
pub struct ListarPacientesPorTutor {
    pacientes: Arc<dyn PacienteRepository>,
}

impl ListarPacientesPorTutor {
    pub fn new(pacientes: Arc<dyn PacienteRepository>) -> Self {
        Self { pacientes }
    }

    pub fn execute(&self, tutor_id: &str) -> ServiceResult<Vec<PacienteSnapshot>> {
        let tutor_id = TutorId::parse(tutor_id)?;
        let pacientes = self.pacientes.listar_por_tutor(&tutor_id)?;
        tracing::debug!(tutor_id = %tutor_id, total = pacientes.len(), "patients listed");
        Ok(pacientes.iter().map(|p| p.snapshot()).collect())
    }
}
