//! Parsing of the human-readable clock string sent with `display_test`.
//!
//! Format: `M/D/YYYY, H:MM:SS AM|PM` (month, day and hour take one or two digits,
//! the suffix is upper case). The wall-clock value is read as UTC, which is what
//! the display's clock runs in.
//!
//! A day past the end of its month rolls into the next month (`2/30/2025` is
//! March 2nd), the same normalisation the device's C library applies.

use chrono::{Days, NaiveDate};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("timestamp does not match M/D/YYYY, H:MM:SS AM|PM: {0:?}")]
    Pattern(String),
    #[error("timestamp {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u32 },
}

/// Parses a display timestamp into milliseconds since the Unix epoch.
pub fn parse_display_timestamp(text: &str) -> Result<i64, TimestampError> {
    let pattern = || TimestampError::Pattern(text.to_string());

    let (date, time) = text.split_once(", ").ok_or_else(pattern)?;
    let (clock, suffix) = time.split_once(' ').ok_or_else(pattern)?;

    let mut date_parts = date.split('/');
    let month = digits(date_parts.next(), 1, 2).ok_or_else(pattern)?;
    let day = digits(date_parts.next(), 1, 2).ok_or_else(pattern)?;
    let year = digits(date_parts.next(), 4, 4).ok_or_else(pattern)?;
    if date_parts.next().is_some() {
        return Err(pattern());
    }

    let mut clock_parts = clock.split(':');
    let hour = digits(clock_parts.next(), 1, 2).ok_or_else(pattern)?;
    let minute = digits(clock_parts.next(), 2, 2).ok_or_else(pattern)?;
    let second = digits(clock_parts.next(), 2, 2).ok_or_else(pattern)?;
    if clock_parts.next().is_some() {
        return Err(pattern());
    }

    let pm = match suffix {
        "AM" => false,
        "PM" => true,
        _ => return Err(pattern()),
    };

    check("month", month, 1, 12)?;
    check("day", day, 1, 31)?;
    check("year", year, 2020, 2100)?;
    check("hour", hour, 0, 23)?;
    check("minute", minute, 0, 59)?;
    check("second", second, 0, 59)?;

    let hour = match (pm, hour) {
        (true, h) if h < 12 => h + 12,
        (false, 12) => 0,
        (_, h) => h,
    };

    // Cannot fail after the range checks.
    let datetime = NaiveDate::from_ymd_opt(year as i32, month, 1)
        .and_then(|first| first.checked_add_days(Days::new(u64::from(day - 1))))
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(pattern)?;

    Ok(datetime.and_utc().timestamp_millis())
}

fn digits(part: Option<&str>, min: usize, max: usize) -> Option<u32> {
    let part = part?;
    if part.len() < min || part.len() > max || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn check(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), TimestampError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(TimestampError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_afternoon_time() {
        assert_eq!(parse_display_timestamp("9/28/2025, 6:00:26 PM"), Ok(1_759_082_426_000));
    }

    #[test]
    fn twelve_am_is_midnight_and_twelve_pm_is_noon() {
        assert_eq!(parse_display_timestamp("1/1/2025, 12:05:00 AM"), Ok(1_735_689_900_000));
        assert_eq!(parse_display_timestamp("09/28/2025, 12:30:00 PM"), Ok(1_759_062_600_000));
    }

    #[test]
    fn day_overflow_rolls_into_next_month() {
        assert_eq!(parse_display_timestamp("2/30/2025, 12:00:00 PM"), Ok(1_740_916_800_000));
    }

    #[test]
    fn invalid_month_is_out_of_range() {
        assert_eq!(
            parse_display_timestamp("13/1/2025, 1:00:00 PM"),
            Err(TimestampError::OutOfRange { field: "month", value: 13 })
        );
    }

    #[test]
    fn other_ranges_are_checked() {
        assert!(matches!(
            parse_display_timestamp("1/32/2025, 1:00:00 PM"),
            Err(TimestampError::OutOfRange { field: "day", .. })
        ));
        assert!(matches!(
            parse_display_timestamp("1/1/2019, 1:00:00 PM"),
            Err(TimestampError::OutOfRange { field: "year", .. })
        ));
        assert!(matches!(
            parse_display_timestamp("1/1/2025, 1:60:00 PM"),
            Err(TimestampError::OutOfRange { field: "minute", .. })
        ));
        assert!(matches!(
            parse_display_timestamp("1/1/2025, 24:00:00 AM"),
            Err(TimestampError::OutOfRange { field: "hour", .. })
        ));
    }

    #[test]
    fn suffix_is_case_sensitive() {
        assert!(matches!(
            parse_display_timestamp("9/28/2025, 6:00:26 pm"),
            Err(TimestampError::Pattern(_))
        ));
    }

    #[test]
    fn rejects_shape_mismatches() {
        for text in [
            "",
            "9/28/2025 6:00:26 PM",
            "9/28/25, 6:00:26 PM",
            "9-28-2025, 6:00:26 PM",
            "9/28/2025, 6:0:26 PM",
            "9/28/2025, 6:00:26",
            "9/28/2025/1, 6:00:26 PM",
        ] {
            assert!(
                matches!(parse_display_timestamp(text), Err(TimestampError::Pattern(_))),
                "{text:?} should not match"
            );
        }
    }
}
