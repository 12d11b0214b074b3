//! `Clock`: the domain's only source of time and timezone resolution.
//!
//! The domain never reads system time and never does timezone arithmetic itself.
//! Converting a civil date + wall-clock time in a named timezone into an absolute
//! instant is delegated entirely to an implementation of this port.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

use crate::error::{DomainError, DomainResult};

/// Time capability consumed by the domain.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Absolute instant of `hours:minutes` on the given civil `date` in `timezone`.
    fn at(&self, timezone: &str, date: NaiveDate, hours: u32, minutes: u32) -> DomainResult<DateTime<Utc>>;

    /// Absolute instant of `hours:minutes` today (civil date of "now" in `timezone`).
    fn today_at(&self, timezone: &str, hours: u32, minutes: u32) -> DomainResult<DateTime<Utc>>;
}

/// Deterministic clock with a settable "now" and fixed UTC offsets per timezone name.
///
/// Intended for tests and replay tooling. `"UTC"` is always known; other names
/// must be registered with [`FixedClock::with_timezone`].
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
    offsets: HashMap<String, FixedOffset>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut offsets = HashMap::new();
        offsets.insert("UTC".to_string(), Utc.fix());
        Self {
            now: RwLock::new(now),
            offsets,
        }
    }

    /// Register `timezone` as a fixed offset of `offset_seconds` east of UTC.
    ///
    /// Offsets outside ±24h are ignored.
    pub fn with_timezone(mut self, timezone: impl Into<String>, offset_seconds: i32) -> Self {
        if let Some(offset) = FixedOffset::east_opt(offset_seconds) {
            self.offsets.insert(timezone.into(), offset);
        }
        self
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }

    fn offset(&self, timezone: &str) -> DomainResult<FixedOffset> {
        self.offsets
            .get(timezone)
            .copied()
            .ok_or_else(|| DomainError::validation(format!("unknown timezone: {timezone}")))
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn at(&self, timezone: &str, date: NaiveDate, hours: u32, minutes: u32) -> DomainResult<DateTime<Utc>> {
        let offset = self.offset(timezone)?;
        let local = date
            .and_hms_opt(hours, minutes, 0)
            .ok_or_else(|| DomainError::validation(format!("invalid wall-clock time {hours}:{minutes}")))?;
        offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| DomainError::validation(format!("unresolvable local time {local} in {timezone}")))
    }

    fn today_at(&self, timezone: &str, hours: u32, minutes: u32) -> DomainResult<DateTime<Utc>> {
        let offset = self.offset(timezone)?;
        let today = self.now_utc().with_timezone(&offset).date_naive();
        self.at(timezone, today, hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 1, 30, 0).unwrap())
            .with_timezone("America/Sao_Paulo", -3 * 3600)
    }

    #[test]
    fn at_resolves_wall_clock_time_through_registered_offset() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let instant = clock().at("America/Sao_Paulo", date, 8, 0).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn today_at_uses_civil_date_of_the_timezone() {
        // 01:30Z is still 2023-12-31 in Sao Paulo.
        let instant = clock().today_at("America/Sao_Paulo", 20, 0).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap());
    }

    #[test]
    fn unknown_timezone_is_a_validation_error() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            clock().at("Mars/Olympus", date, 8, 0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn now_can_be_moved() {
        let clock = clock();
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.now_utc(), Utc.with_ymd_and_hms(2024, 1, 1, 2, 30, 0).unwrap());
    }
}
