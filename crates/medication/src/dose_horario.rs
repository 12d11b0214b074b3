use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use agenda_core::{DomainError, DomainResult, ValueObject};

/// Wall-clock time of day at which a dose is due (`hh:mm`, 24h).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoseHorario {
    hours: u32,
    minutes: u32,
}

impl ValueObject for DoseHorario {}

impl DoseHorario {
    /// Parse `"hh:mm"` (surrounding whitespace ignored, exactly two digits per field).
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim();
        let bytes = normalized.as_bytes();

        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && bytes[..2].iter().all(u8::is_ascii_digit)
            && bytes[3..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(DomainError::validation("dose horario must use the hh:mm format"));
        }

        let hours: u32 = normalized[..2]
            .parse()
            .map_err(|_| DomainError::validation("dose horario must use the hh:mm format"))?;
        let minutes: u32 = normalized[3..]
            .parse()
            .map_err(|_| DomainError::validation("dose horario must use the hh:mm format"))?;

        Self::new(hours, minutes)
    }

    pub fn new(hours: u32, minutes: u32) -> DomainResult<Self> {
        if hours > 23 || minutes > 59 {
            return Err(DomainError::validation(format!(
                "invalid dose horario {hours:02}:{minutes:02}"
            )));
        }
        Ok(Self { hours, minutes })
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }
}

impl core::fmt::Display for DoseHorario {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

impl FromStr for DoseHorario {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DoseHorario {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DoseHorario {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
