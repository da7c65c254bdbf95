//! Calendar-day arithmetic in the billing time zone.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Resolves calendar days and local midnights for scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingCalendar {
    tz: Tz,
}

impl Default for BillingCalendar {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl BillingCalendar {
    /// Creates a calendar for a time zone.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Creates a calendar from an IANA name such as `Europe/London`.
    pub fn from_name(name: &str) -> Result<Self, String> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| format!("Unknown time zone: {name}"))
    }

    /// The time zone in use.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local calendar date of an instant.
    #[must_use]
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    /// First instant of a local date.
    ///
    /// When midnight falls into a DST gap the first existing local time
    /// after it is used.
    #[must_use]
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        (0..=3)
            .find_map(|hours| {
                self.tz
                    .from_local_datetime(&(midnight + TimeDelta::hours(hours)))
                    .earliest()
            })
            .map_or_else(
                || Utc.from_utc_datetime(&midnight),
                |local| local.with_timezone(&Utc),
            )
    }

    /// Local midnight `days` calendar days after the date of `at`.
    #[must_use]
    pub fn midnight_after(&self, at: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
        self.local_date(at)
            .checked_add_days(Days::new(u64::from(days)))
            .map(|date| self.start_of_day(date))
    }

    /// Start of the local calendar month containing `at`.
    #[must_use]
    pub fn month_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.local_date(at);
        let first = date.with_day(1).unwrap_or(date);
        self.start_of_day(first)
    }
}
