//! `agenda-medication`: medication schedules, dose projection and confirmation.
//!
//! - [`EsquemaDose`] projects concrete dose instants over a query window.
//! - [`Medicamento`] owns one schedule and announces schedule changes.
//! - [`DoseLog`] tracks one dose occurrence through `PENDENTE → TOMADO | ATRASADO`.
//! - [`Adesao`] summarizes how many scheduled doses were taken.

pub mod adesao;
pub mod dose_horario;
pub mod dose_log;
pub mod esquema;
pub mod events;
pub mod medicamento;
pub mod unidade;

pub use adesao::{Adesao, AdesaoSnapshot};
pub use dose_horario::DoseHorario;
pub use dose_log::{
    ComandoDose, DoseLog, DoseLogProps, DoseLogSnapshot, DoseStatus, EfeitoHorarioReal, Transicao,
};
pub use esquema::{DoseProjecao, EsquemaDose, EsquemaDoseSnapshot, Recorrencia, TipoRecorrencia};
pub use events::{DoseConfirmada, EsquemaDeDoseAlterado, MedicationEvent};
pub use medicamento::{Medicamento, MedicamentoProps, MedicamentoSnapshot};
pub use unidade::UnidadeDosagem;
