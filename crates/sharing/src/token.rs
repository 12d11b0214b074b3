use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use agenda_core::{DomainError, DomainResult, ValueObject};

const TAMANHO_MINIMO: usize = 24;

/// Opaque bearer token identifying a share link.
///
/// At least 24 characters drawn from `[A-Za-z0-9_-]`, surrounding whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenShare(String);

impl ValueObject for TokenShare {}

impl TokenShare {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim();

        if normalized.is_empty() {
            return Err(DomainError::validation("share token cannot be empty"));
        }
        if normalized.chars().count() < TAMANHO_MINIMO {
            return Err(DomainError::validation(format!(
                "share token must have at least {TAMANHO_MINIMO} characters"
            )));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::validation(
                "share token contains invalid characters",
            ));
        }

        Ok(Self(normalized.to_string()))
    }

    /// Fresh random token (32 hex characters).
    pub fn gerar() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TokenShare {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TokenShare {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TokenShare {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TokenShare {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
