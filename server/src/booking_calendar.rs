//! Calendar rules for bookable days
//!
//! Bookings are restricted to a configurable set of weekdays (usually only Tuesdays). The rule is
//! enforced server-side by the booking endpoints, before a booking reaches the data store.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt::{Display, Formatter};

/// Maximum number of dates returned by [BookingCalendar::upcoming_dates]
pub const MAX_UPCOMING_DATES: usize = 52;

#[derive(Clone, Debug)]
pub struct BookingCalendar {
    /// Weekdays on which tables can be booked. `None` means every day is bookable.
    allowed_weekdays: Option<Vec<Weekday>>,
    /// Timezone for determining the current date
    timezone: chrono_tz::Tz,
}

#[derive(Debug, PartialEq)]
pub struct InvalidWeekdayList(pub String);

impl Display for InvalidWeekdayList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid weekday list: '{}'", self.0)
    }
}

impl BookingCalendar {
    pub fn new(allowed_weekdays: Option<Vec<Weekday>>, timezone: chrono_tz::Tz) -> Self {
        Self {
            allowed_weekdays,
            timezone,
        }
    }

    /// Parse the calendar rule from a comma-separated list of weekday names, like "Tue" or
    /// "Tuesday, Thursday". The special value "any" allows all days.
    pub fn from_weekday_list(
        value: &str,
        timezone: chrono_tz::Tz,
    ) -> Result<Self, InvalidWeekdayList> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("any") {
            return Ok(Self::new(None, timezone));
        }
        let mut weekdays = value
            .split(',')
            .map(|day| day.trim().parse::<Weekday>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| InvalidWeekdayList(value.to_owned()))?;
        if weekdays.is_empty() {
            return Err(InvalidWeekdayList(value.to_owned()));
        }
        weekdays.sort_by_key(|d| d.num_days_from_monday());
        weekdays.dedup();
        Ok(Self::new(Some(weekdays), timezone))
    }

    pub fn is_bookable(&self, date: NaiveDate) -> bool {
        match &self.allowed_weekdays {
            None => true,
            Some(weekdays) => weekdays.contains(&date.weekday()),
        }
    }

    /// The current date in the configured timezone
    pub fn today(&self) -> NaiveDate {
        chrono::Utc::now()
            .with_timezone(&self.timezone)
            .date_naive()
    }

    /// Get the next `count` bookable dates, starting with `from` (inclusive).
    ///
    /// `count` is capped at [MAX_UPCOMING_DATES].
    pub fn upcoming_dates(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
        from.iter_days()
            .filter(|d| self.is_bookable(*d))
            .take(count.min(MAX_UPCOMING_DATES))
            .collect()
    }

    /// Human-readable description of the bookable days, for error messages
    pub fn describe_allowed_days(&self) -> String {
        match &self.allowed_weekdays {
            None => "any day".to_owned(),
            Some(weekdays) => weekdays
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl Default for BookingCalendar {
    fn default() -> Self {
        Self::new(Some(vec![Weekday::Tue]), chrono_tz::UTC)
    }
}
