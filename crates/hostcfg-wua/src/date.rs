//! OLE automation date decoding

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Smallest representable automation date (0100-01-01)
const MIN_AUTOMATION_DATE: f64 = -657_434.0;

/// First value past the largest representable automation date (10000-01-01)
const MAX_AUTOMATION_DATE: f64 = 2_958_466.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Decode an automation date into a UTC timestamp
///
/// The integral part counts days from 1899-12-30; the absolute value of the
/// fractional part is the time of day, also for negative dates.
/// Returns `None` for non-finite values and values outside years 100..=9999.
#[must_use]
pub fn from_automation_date(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || !(MIN_AUTOMATION_DATE..MAX_AUTOMATION_DATE).contains(&value) {
        return None;
    }

    let days = value.trunc();
    let fraction = (value - days).abs();
    #[allow(clippy::cast_possible_truncation)]
    let millis = (fraction * MILLIS_PER_DAY).round() as i64;
    #[allow(clippy::cast_possible_truncation)]
    let days = days as i64;

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let naive = epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(millis))?;

    Some(naive.and_utc())
}
