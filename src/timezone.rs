//! Resolves the configured timezone so the app agrees with the user on what
//! calendar date "today" is.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone, timezones};

use crate::Error;

/// Resolve a canonical timezone name, e.g. "Europe/Prague", to its current
/// UTC offset.
///
/// # Errors
/// This function will return an [Error::InvalidTimezoneError] if
/// `canonical_timezone` does not name a timezone in the IANA database.
pub fn local_offset(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    let timezone = timezones::get_by_name(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    Ok(timezone.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current calendar date in the given timezone.
///
/// # Errors
/// This function will return an [Error::InvalidTimezoneError] if
/// `canonical_timezone` does not name a timezone in the IANA database.
pub fn today_in(canonical_timezone: &str) -> Result<Date, Error> {
    let offset = local_offset(canonical_timezone)?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}
