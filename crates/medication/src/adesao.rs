use serde::{Deserialize, Serialize};

use agenda_core::{DomainError, DomainResult, Periodo, PeriodoSnapshot, ValueObject};

use crate::dose_log::{DoseLog, DoseStatus};

const CASAS_DECIMAIS_PADRAO: u32 = 4;
const CASAS_DECIMAIS_MAX: u32 = 6;

/// Adherence ratio over a period: share of scheduled doses actually taken.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Adesao {
    valor: f64,
    periodo: Periodo,
}

impl ValueObject for Adesao {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdesaoSnapshot {
    pub valor: f64,
    pub percentual: f64,
    pub periodo: PeriodoSnapshot,
}

impl Adesao {
    /// `valor` must be finite and within `[0, 1]`; it is rounded to `casas_decimais`
    /// (default 4, clamped to at most 6).
    pub fn new(valor: f64, periodo: Periodo, casas_decimais: Option<u32>) -> DomainResult<Self> {
        if !valor.is_finite() || !(0.0..=1.0).contains(&valor) {
            return Err(DomainError::validation(
                "adherence must be a number between 0 and 1",
            ));
        }

        let casas = casas_decimais
            .unwrap_or(CASAS_DECIMAIS_PADRAO)
            .min(CASAS_DECIMAIS_MAX);
        let fator = 10f64.powi(casas as i32);

        Ok(Self {
            valor: (valor * fator).round() / fator,
            periodo,
        })
    }

    /// Adherence of the logs whose scheduled instant lies in `periodo`.
    ///
    /// An empty sample yields 0.
    pub fn calcular<'a>(
        logs: impl IntoIterator<Item = &'a DoseLog>,
        periodo: Periodo,
    ) -> DomainResult<Self> {
        let (total, tomadas) = logs
            .into_iter()
            .filter(|log| periodo.contem(log.horario_previsto()))
            .fold((0u32, 0u32), |(total, tomadas), log| {
                let tomada = u32::from(log.status() == DoseStatus::Tomado);
                (total + 1, tomadas + tomada)
            });

        let valor = if total == 0 {
            0.0
        } else {
            f64::from(tomadas) / f64::from(total)
        };
        Self::new(valor, periodo, None)
    }

    pub fn valor(&self) -> f64 {
        self.valor
    }

    pub fn periodo(&self) -> &Periodo {
        &self.periodo
    }

    /// Percentage with two decimal places.
    pub fn percentual(&self) -> f64 {
        (self.valor * 10_000.0).round() / 100.0
    }

    pub fn snapshot(&self) -> AdesaoSnapshot {
        AdesaoSnapshot {
            valor: self.valor,
            percentual: self.percentual(),
            periodo: self.periodo.snapshot(),
        }
    }
}
