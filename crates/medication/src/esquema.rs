//! Recurring dose schedules and their projection into concrete dose instants.
//!
//! A schedule never does timezone arithmetic itself: it walks civil dates and asks
//! the [`Clock`] to resolve each `(timezone, date, hh:mm)` into an absolute instant.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use agenda_core::{Clock, DomainError, DomainResult, Periodo, PeriodoSnapshot};

use crate::dose_horario::DoseHorario;

/// Persisted discriminator of a schedule's recurrence kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TipoRecorrencia {
    #[serde(rename = "DIARIO_HORARIOS_FIXOS")]
    DiarioHorariosFixos,
    #[serde(rename = "SEMANAL_DIAS_FIXOS")]
    SemanalDiasFixos,
}

impl TipoRecorrencia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiarioHorariosFixos => "DIARIO_HORARIOS_FIXOS",
            Self::SemanalDiasFixos => "SEMANAL_DIAS_FIXOS",
        }
    }
}

impl core::fmt::Display for TipoRecorrencia {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TipoRecorrencia {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "DIARIO_HORARIOS_FIXOS" => Ok(Self::DiarioHorariosFixos),
            "SEMANAL_DIAS_FIXOS" => Ok(Self::SemanalDiasFixos),
            other => Err(DomainError::validation(format!(
                "unsupported dose recurrence: {other}"
            ))),
        }
    }
}

/// One projected dose occurrence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DoseProjecao {
    pub horario_previsto: DateTime<Utc>,
}

/// Which calendar days a schedule fires on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorrencia {
    /// Every calendar day.
    Diaria,
    /// Only on the given weekdays (0 = Sunday .. 6 = Saturday), never empty.
    Semanal { dias_da_semana: BTreeSet<u8> },
}

impl Recorrencia {
    fn aplica_em(&self, dia: NaiveDate) -> bool {
        match self {
            Recorrencia::Diaria => true,
            Recorrencia::Semanal { dias_da_semana } => {
                dias_da_semana.contains(&(dia.weekday().num_days_from_sunday() as u8))
            }
        }
    }
}

/// A recurring dosing schedule: fixed wall-clock times, a timezone, an optional
/// validity window (`vigencia`) and a recurrence kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsquemaDose {
    horarios: Vec<DoseHorario>,
    timezone: String,
    vigencia: Option<Periodo>,
    recorrencia: Recorrencia,
}

/// Serialized shape of an [`EsquemaDose`]; `tipo` selects the variant on rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsquemaDoseSnapshot {
    pub tipo: TipoRecorrencia,
    pub timezone: String,
    pub horarios: Vec<DoseHorario>,
    pub vigencia: Option<PeriodoSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dias_da_semana: Option<Vec<u8>>,
}

impl EsquemaDose {
    /// Daily schedule firing at every `horario` each calendar day.
    pub fn diario(
        horarios: Vec<DoseHorario>,
        timezone: impl Into<String>,
        vigencia: Option<Periodo>,
    ) -> DomainResult<Self> {
        Self::build(horarios, timezone.into(), vigencia, Recorrencia::Diaria)
    }

    /// Weekly schedule firing at every `horario` on the listed weekdays (0 = Sunday).
    pub fn semanal(
        horarios: Vec<DoseHorario>,
        dias_da_semana: impl IntoIterator<Item = u8>,
        timezone: impl Into<String>,
        vigencia: Option<Periodo>,
    ) -> DomainResult<Self> {
        let dias: BTreeSet<u8> = dias_da_semana.into_iter().collect();
        if dias.is_empty() {
            return Err(DomainError::validation(
                "weekly schedule requires at least one weekday",
            ));
        }
        if let Some(dia) = dias.iter().find(|d| **d > 6) {
            return Err(DomainError::validation(format!(
                "invalid weekday in schedule: {dia}"
            )));
        }
        Self::build(
            horarios,
            timezone.into(),
            vigencia,
            Recorrencia::Semanal { dias_da_semana: dias },
        )
    }

    fn build(
        horarios: Vec<DoseHorario>,
        timezone: String,
        vigencia: Option<Periodo>,
        recorrencia: Recorrencia,
    ) -> DomainResult<Self> {
        if horarios.is_empty() {
            return Err(DomainError::validation(
                "dose schedule requires at least one horario",
            ));
        }
        let timezone = timezone.trim().to_string();
        if timezone.is_empty() {
            return Err(DomainError::validation("dose schedule requires a timezone"));
        }
        Ok(Self {
            horarios,
            timezone,
            vigencia,
            recorrencia,
        })
    }

    pub fn tipo(&self) -> TipoRecorrencia {
        match self.recorrencia {
            Recorrencia::Diaria => TipoRecorrencia::DiarioHorariosFixos,
            Recorrencia::Semanal { .. } => TipoRecorrencia::SemanalDiasFixos,
        }
    }

    pub fn horarios(&self) -> &[DoseHorario] {
        &self.horarios
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn vigencia(&self) -> Option<&Periodo> {
        self.vigencia.as_ref()
    }

    pub fn recorrencia(&self) -> &Recorrencia {
        &self.recorrencia
    }

    /// Project every dose instant this schedule implies inside `periodo`.
    ///
    /// `periodo` must be bounded on both sides. It is narrowed by the schedule's
    /// `vigencia`; an empty intersection is an error rather than an empty list.
    /// Output is sorted ascending and depends only on the inputs and the clock.
    pub fn projetar_instancias(
        &self,
        periodo: &Periodo,
        clock: &dyn Clock,
    ) -> DomainResult<Vec<DoseProjecao>> {
        let (inicio, fim) = self.janela_efetiva(periodo)?;

        let mut projecoes = Vec::new();
        let ultimo_dia = fim.date_naive();
        let mut dia = inicio.date_naive();

        while dia <= ultimo_dia {
            if self.recorrencia.aplica_em(dia) {
                for horario in &self.horarios {
                    let previsto = clock.at(&self.timezone, dia, horario.hours(), horario.minutes())?;
                    // Timezone resolution near the window edges can land outside it.
                    if previsto < inicio || previsto > fim {
                        continue;
                    }
                    projecoes.push(DoseProjecao {
                        horario_previsto: previsto,
                    });
                }
            }
            match dia.succ_opt() {
                Some(next) => dia = next,
                None => break,
            }
        }

        projecoes.sort();
        Ok(projecoes)
    }

    /// Intersection of the query window with the schedule's validity window.
    fn janela_efetiva(&self, periodo: &Periodo) -> DomainResult<(DateTime<Utc>, DateTime<Utc>)> {
        let (Some(mut inicio), Some(mut fim)) = (periodo.inicio(), periodo.fim()) else {
            return Err(DomainError::validation(
                "projection periodo requires both inicio and fim",
            ));
        };

        if let Some(vigencia) = &self.vigencia {
            if let Some(vigencia_inicio) = vigencia.inicio() {
                inicio = inicio.max(vigencia_inicio);
            }
            if let Some(vigencia_fim) = vigencia.fim() {
                fim = fim.min(vigencia_fim);
            }
        }

        if inicio > fim {
            return Err(DomainError::out_of_range(
                "projection periodo does not intersect the schedule vigencia",
            ));
        }

        Ok((inicio, fim))
    }

    pub fn snapshot(&self) -> EsquemaDoseSnapshot {
        EsquemaDoseSnapshot {
            tipo: self.tipo(),
            timezone: self.timezone.clone(),
            horarios: self.horarios.clone(),
            vigencia: self.vigencia.as_ref().map(Periodo::snapshot),
            dias_da_semana: match &self.recorrencia {
                Recorrencia::Diaria => None,
                Recorrencia::Semanal { dias_da_semana } => {
                    Some(dias_da_semana.iter().copied().collect())
                }
            },
        }
    }

    /// Rebuild the schedule variant selected by the stored discriminator.
    pub fn from_snapshot(snapshot: &EsquemaDoseSnapshot) -> DomainResult<Self> {
        let vigencia = snapshot
            .vigencia
            .as_ref()
            .map(Periodo::from_snapshot)
            .transpose()?;
        let horarios = snapshot.horarios.clone();

        match snapshot.tipo {
            TipoRecorrencia::DiarioHorariosFixos => {
                Self::diario(horarios, snapshot.timezone.clone(), vigencia)
            }
            TipoRecorrencia::SemanalDiasFixos => Self::semanal(
                horarios,
                snapshot.dias_da_semana.clone().unwrap_or_default(),
                snapshot.timezone.clone(),
                vigencia,
            ),
        }
    }
}
