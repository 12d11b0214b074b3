//! Production [`Clock`] backed by the IANA timezone database.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use agenda_core::{Clock, DomainError, DomainResult};

/// Wall clock resolving civil times through `chrono-tz`.
///
/// A local time inside a DST gap is shifted forward by the gap length; an
/// ambiguous local time (DST fall-back) resolves to its earliest instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn parse_timezone(timezone: &str) -> DomainResult<Tz> {
    timezone
        .trim()
        .parse::<Tz>()
        .map_err(|_| DomainError::validation(format!("unknown timezone: {timezone}")))
}

fn resolve(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Gap: keep the offset in force before the transition.
            let before = tz
                .offset_from_utc_datetime(&(local - Duration::days(1)))
                .fix()
                .local_minus_utc();
            Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(before))))
        }
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn at(&self, timezone: &str, date: NaiveDate, hours: u32, minutes: u32) -> DomainResult<DateTime<Utc>> {
        let tz = parse_timezone(timezone)?;
        let local = date.and_hms_opt(hours, minutes, 0).ok_or_else(|| {
            DomainError::validation(format!("invalid civil time {hours:02}:{minutes:02}"))
        })?;
        Ok(resolve(tz, local))
    }

    fn today_at(&self, timezone: &str, hours: u32, minutes: u32) -> DomainResult<DateTime<Utc>> {
        let tz = parse_timezone(timezone)?;
        let today = self.now_utc().with_timezone(&tz).date_naive();
        self.at(timezone, today, hours, minutes)
    }
}
