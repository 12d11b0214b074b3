use core::str::FromStr;

use serde::{Deserialize, Serialize};

use agenda_core::{DomainError, DomainResult, ValueObject};

/// Unit a medication's dosage is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnidadeDosagem {
    Mg,
    Ml,
    Gotas,
    Comprimidos,
    Capsulas,
}

impl ValueObject for UnidadeDosagem {}

impl UnidadeDosagem {
    /// Parse a unit name, case-insensitively and ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "mg" => Ok(Self::Mg),
            "ml" => Ok(Self::Ml),
            "gotas" => Ok(Self::Gotas),
            "comprimidos" => Ok(Self::Comprimidos),
            "capsulas" => Ok(Self::Capsulas),
            other => Err(DomainError::validation(format!(
                "unsupported dosage unit: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mg => "mg",
            Self::Ml => "ml",
            Self::Gotas => "gotas",
            Self::Comprimidos => "comprimidos",
            Self::Capsulas => "capsulas",
        }
    }
}

impl core::fmt::Display for UnidadeDosagem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnidadeDosagem {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
