//! Date-time ranges used to scope summaries, e.g. the current calendar month.

use serde::Serialize;
use time::{Date, Duration, Month, OffsetDateTime, Time, UtcOffset};

use crate::Error;

/// An inclusive range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateTimeRange {
    /// The first instant in the range.
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// The last instant in the range.
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl DateTimeRange {
    /// Whether `instant` lies inside the range, bounds included.
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// The calendar month `month` (1-12) of `year` in the timezone given by
/// `offset`, from the first day at 00:00:00 to the last day at 23:59:59.
///
/// # Errors
/// Returns [Error::InvalidDate] if `month` is not in 1..=12 or `year` is out
/// of range.
pub fn month_range(year: i32, month: u8, offset: UtcOffset) -> Result<DateTimeRange, Error> {
    let month = Month::try_from(month).map_err(|error| Error::InvalidDate(error.to_string()))?;
    let first_day = Date::from_calendar_date(year, month, 1)
        .map_err(|error| Error::InvalidDate(error.to_string()))?;
    let last_day = Date::from_calendar_date(year, month, last_day_of_month(year, month))
        .map_err(|error| Error::InvalidDate(error.to_string()))?;

    let end_of_day =
        Time::from_hms(23, 59, 59).map_err(|error| Error::InvalidDate(error.to_string()))?;

    Ok(DateTimeRange {
        start: first_day.with_time(Time::MIDNIGHT).assume_offset(offset),
        end: last_day.with_time(end_of_day).assume_offset(offset),
    })
}

/// The calendar month containing `now`, as seen from the timezone given by
/// `offset`.
pub fn current_month_range(now: OffsetDateTime, offset: UtcOffset) -> Result<DateTimeRange, Error> {
    let local_now = now.to_offset(offset);

    month_range(local_now.year(), local_now.month().into(), offset)
}

/// The `days` days leading up to and including `now`.
pub fn trailing_days(now: OffsetDateTime, days: u32) -> DateTimeRange {
    DateTimeRange {
        start: now - Duration::days(days.into()),
        end: now,
    }
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use time::{
        Duration, UtcOffset,
        macros::{datetime, offset},
    };

    use crate::Error;

    use super::{current_month_range, month_range, trailing_days};

    #[test]
    fn month_range_covers_whole_days() {
        let range = month_range(2025, 2, UtcOffset::UTC).unwrap();

        assert_eq!(range.start, datetime!(2025-02-01 00:00:00 UTC));
        assert_eq!(range.end, datetime!(2025-02-28 23:59:59 UTC));
    }

    #[test]
    fn month_range_handles_leap_years() {
        let range = month_range(2024, 2, UtcOffset::UTC).unwrap();

        assert_eq!(range.end, datetime!(2024-02-29 23:59:59 UTC));
    }

    #[test]
    fn month_range_rejects_month_thirteen() {
        let result = month_range(2024, 13, UtcOffset::UTC);

        assert!(matches!(result, Err(Error::InvalidDate(_))));
    }

    #[test]
    fn current_month_uses_local_calendar() {
        // 02:00 UTC on the 1st is still the previous month three hours behind UTC.
        let now = datetime!(2025-03-01 02:00:00 UTC);

        let range = current_month_range(now, offset!(-3)).unwrap();

        assert_eq!(range.start, datetime!(2025-02-01 00:00:00 -3));
        assert_eq!(range.end, datetime!(2025-02-28 23:59:59 -3));
        assert!(range.contains(now));
    }

    #[test]
    fn trailing_days_ends_now() {
        let now = datetime!(2025-03-31 12:00:00 UTC);

        let range = trailing_days(now, 30);

        assert_eq!(range.start, now - Duration::days(30));
        assert_eq!(range.end, now);
    }
}
