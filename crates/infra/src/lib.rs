//! Infrastructure layer: wall clock, configuration, persistence adapters and the
//! application services that wire domain aggregates to them.

pub mod clock;
pub mod config;
pub mod error;
pub mod repository;
pub mod services;


pub use clock::SystemClock;
pub use config::{AppConfig, ConfigError};
pub use error::{RepositoryError, ServiceError, ServiceResult};
pub use repository::{
    DoseLogRepository, InMemoryDoseLogRepository, InMemoryMedicamentoRepository,
    InMemoryPacienteRepository, InMemoryShareLinkRepository, MedicamentoRepository,
    PacienteRepository, ShareLinkRepository,
};
