//! `agenda-patients`: patient records and health-plan value objects.

pub mod carteirinha;
pub mod paciente;
pub mod plano_saude;

pub use carteirinha::NumeroCarteirinha;
pub use paciente::{Paciente, PacienteProps, PacienteSnapshot, PerfilPaciente};
pub use plano_saude::{PlanoSaude, PlanoSaudeProps, PlanoSaudeSnapshot};
