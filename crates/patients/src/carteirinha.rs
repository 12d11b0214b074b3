use serde::{Deserialize, Deserializer, Serialize, Serializer};

use agenda_core::{DomainError, DomainResult, ValueObject};

const TAMANHO_MAXIMO: usize = 40;

/// Health-plan membership card number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumeroCarteirinha(String);

impl ValueObject for NumeroCarteirinha {}

impl NumeroCarteirinha {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(DomainError::validation("membership card number cannot be empty"));
        }
        if normalized.chars().count() > TAMANHO_MAXIMO {
            return Err(DomainError::validation(format!(
                "membership card number exceeds {TAMANHO_MAXIMO} characters"
            )));
        }
        Ok(Self(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for NumeroCarteirinha {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for NumeroCarteirinha {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NumeroCarteirinha {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
