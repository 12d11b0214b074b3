//! Persistence ports for the dosing, sharing and patient aggregates.
//!
//! The ports make no storage assumptions; the in-memory adapters store snapshots
//! and rebuild aggregates from them, the same round trip a SQL adapter would do.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{
    InMemoryDoseLogRepository, InMemoryMedicamentoRepository, InMemoryPacienteRepository,
    InMemoryShareLinkRepository,
};
pub use r#trait::{
    DoseLogRepository, MedicamentoRepository, PacienteRepository, ShareLinkRepository,
};
