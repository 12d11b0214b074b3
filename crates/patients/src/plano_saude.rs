use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenda_core::{Clock, DomainError, DomainResult};

use crate::carteirinha::NumeroCarteirinha;

const OPERADORA_MAX: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanoSaudeProps {
    pub operadora: String,
    pub numero_carteirinha: NumeroCarteirinha,
    pub validade: Option<DateTime<Utc>>,
    pub arquivado: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanoSaudeSnapshot {
    pub operadora: String,
    pub numero_carteirinha: NumeroCarteirinha,
    pub validade: Option<String>,
    pub arquivado: bool,
}

/// A patient's health plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanoSaude {
    operadora: String,
    numero_carteirinha: NumeroCarteirinha,
    validade: Option<DateTime<Utc>>,
    arquivado: bool,
}

impl PlanoSaude {
    /// An active (non-archived) plan cannot be created already expired.
    pub fn criar(props: PlanoSaudeProps, clock: &dyn Clock) -> DomainResult<Self> {
        let operadora = props.operadora.trim();
        if operadora.is_empty() {
            return Err(DomainError::validation("health plan requires an operator name"));
        }
        if operadora.chars().count() > OPERADORA_MAX {
            return Err(DomainError::validation(format!(
                "health plan operator exceeds {OPERADORA_MAX} characters"
            )));
        }

        let arquivado = props.arquivado.unwrap_or(false);
        if let Some(validade) = props.validade {
            if !arquivado && validade < clock.now_utc() {
                return Err(DomainError::validation(
                    "an active health plan cannot be already expired",
                ));
            }
        }

        Ok(Self {
            operadora: operadora.to_string(),
            numero_carteirinha: props.numero_carteirinha,
            validade: props.validade,
            arquivado,
        })
    }

    pub fn from_snapshot(snapshot: &PlanoSaudeSnapshot) -> DomainResult<Self> {
        let validade = snapshot
            .validade
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| DomainError::validation(format!("invalid validade '{raw}': {e}")))
            })
            .transpose()?;

        Ok(Self {
            operadora: snapshot.operadora.clone(),
            numero_carteirinha: snapshot.numero_carteirinha.clone(),
            validade,
            arquivado: snapshot.arquivado,
        })
    }

    pub fn esta_valido(&self, em: DateTime<Utc>) -> bool {
        !self.arquivado && self.validade.is_none_or(|validade| validade >= em)
    }

    pub fn arquivar(&mut self) {
        self.arquivado = true;
    }

    pub fn operadora(&self) -> &str {
        &self.operadora
    }

    pub fn numero_carteirinha(&self) -> &NumeroCarteirinha {
        &self.numero_carteirinha
    }

    pub fn validade(&self) -> Option<DateTime<Utc>> {
        self.validade
    }

    pub fn arquivado(&self) -> bool {
        self.arquivado
    }

    pub fn snapshot(&self) -> PlanoSaudeSnapshot {
        PlanoSaudeSnapshot {
            operadora: self.operadora.clone(),
            numero_carteirinha: self.numero_carteirinha.clone(),
            validade: self.validade.map(agenda_core::iso8601),
            arquivado: self.arquivado,
        }
    }
}
