//! `Periodo`: an optionally-bounded time interval.
//!
//! Used both as a projection query window and as a schedule's validity window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Interval with optional inclusive bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Periodo {
    inicio: Option<DateTime<Utc>>,
    fim: Option<DateTime<Utc>>,
}

/// Serialized shape of a [`Periodo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodoSnapshot {
    pub inicio: Option<String>,
    pub fim: Option<String>,
}

impl ValueObject for Periodo {}

impl Periodo {
    /// Build an interval. Fails when both bounds are present and `inicio > fim`.
    pub fn new(inicio: Option<DateTime<Utc>>, fim: Option<DateTime<Utc>>) -> DomainResult<Self> {
        if let (Some(i), Some(f)) = (inicio, fim) {
            if i > f {
                return Err(DomainError::validation(
                    "periodo inicio must be before or equal to fim",
                ));
            }
        }
        Ok(Self { inicio, fim })
    }

    /// Closed interval `[inicio, fim]`.
    pub fn entre(inicio: DateTime<Utc>, fim: DateTime<Utc>) -> DomainResult<Self> {
        Self::new(Some(inicio), Some(fim))
    }

    /// Interval without bounds.
    pub fn ilimitado() -> Self {
        Self::default()
    }

    pub fn inicio(&self) -> Option<DateTime<Utc>> {
        self.inicio
    }

    pub fn fim(&self) -> Option<DateTime<Utc>> {
        self.fim
    }

    /// Membership test with inclusive bounds; a missing bound never excludes.
    pub fn contem(&self, instante: DateTime<Utc>) -> bool {
        if self.inicio.is_some_and(|i| instante < i) {
            return false;
        }
        if self.fim.is_some_and(|f| instante > f) {
            return false;
        }
        true
    }

    pub fn snapshot(&self) -> PeriodoSnapshot {
        PeriodoSnapshot {
            inicio: self.inicio.map(crate::iso8601),
            fim: self.fim.map(crate::iso8601),
        }
    }

    /// Rebuild from the serialized shape (RFC 3339 strings).
    pub fn from_snapshot(snapshot: &PeriodoSnapshot) -> DomainResult<Self> {
        let parse = |raw: &Option<String>| raw.as_deref().map(crate::parse_iso8601).transpose();
        Self::new(parse(&snapshot.inicio)?, parse(&snapshot.fim)?)
    }
}
