//! Resolves canonical timezone names to UTC offsets.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Get the current UTC offset for a canonical timezone name, e.g.
/// "America/Sao_Paulo".
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if `canonical_timezone` is not a
/// known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;

    use crate::Error;

    use super::get_local_offset;

    #[test]
    fn utc_has_zero_offset() {
        assert_eq!(get_local_offset("UTC"), Ok(UtcOffset::UTC));
    }

    #[test]
    fn sao_paulo_is_three_hours_behind() {
        let offset = get_local_offset("America/Sao_Paulo").unwrap();

        assert_eq!(offset.whole_hours(), -3);
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        assert_eq!(
            get_local_offset("Mars/Olympus_Mons"),
            Err(Error::InvalidTimezoneError("Mars/Olympus_Mons".to_owned()))
        );
    }
}
