//! Declared send time parsing and freshness window.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use super::result::FailureReason;

/// Integers with at least this many digits are milliseconds since the epoch.
const MILLIS_MIN_DIGITS: usize = 13;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse a timestamp header value.
///
/// Accepts decimal seconds or milliseconds since the Unix epoch (13 or more
/// digits means milliseconds) and ISO-8601 date-times. ISO values without an
/// offset are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(number) = value.parse::<i64>() {
        let digits = value.trim_start_matches(['+', '-']).len();
        return if digits >= MILLIS_MIN_DIGITS {
            DateTime::from_timestamp_millis(number)
        } else {
            DateTime::from_timestamp(number, 0)
        };
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Bounds on how far a declared send time may be from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampWindow {
    pub allowed_skew: Duration,
    pub max_age: Option<Duration>,
}

impl TimestampWindow {
    pub fn new(allowed_skew: Duration, max_age: Option<Duration>) -> Self {
        Self {
            allowed_skew,
            max_age,
        }
    }

    /// `|now - declared| <= skew`, and `now - declared <= max_age` when set.
    /// Both bounds are inclusive.
    pub fn check(&self, declared: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), FailureReason> {
        let age = now - declared;

        if age > self.allowed_skew || -age > self.allowed_skew {
            return Err(FailureReason::TimestampOutOfWindow);
        }
        if self.max_age.is_some_and(|max_age| age > max_age) {
            return Err(FailureReason::TimestampOutOfWindow);
        }

        Ok(())
    }

    /// Parse `value` and check it against `now`.
    pub fn validate(&self, value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, FailureReason> {
        let declared = parse_timestamp(value).ok_or(FailureReason::InvalidTimestampFormat)?;
        self.check(declared, now)?;
        Ok(declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn default_window() -> TimestampWindow {
        TimestampWindow::new(Duration::minutes(5), Some(Duration::minutes(10)))
    }

    #[test]
    fn test_parse_unix_seconds() {
        assert_eq!(parse_timestamp("1700000000"), Some(at(1_700_000_000)));
        assert_eq!(parse_timestamp("0"), Some(at(0)));
    }

    #[test]
    fn test_parse_unix_millis() {
        let parsed = parse_timestamp("1700000000123").unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
        assert_eq!(parsed.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_twelve_digits_are_seconds() {
        assert_eq!(parse_timestamp("100000000000"), Some(at(100_000_000_000)));
    }

    #[test]
    fn test_parse_iso_with_offset() {
        let parsed = parse_timestamp("2023-11-14T22:13:20+00:00").unwrap();
        assert_eq!(parsed, at(1_700_000_000));

        let parsed = parse_timestamp("2023-11-14T23:13:20+01:00").unwrap();
        assert_eq!(parsed, at(1_700_000_000));

        let parsed = parse_timestamp("2023-11-14T23:13:20+0100").unwrap();
        assert_eq!(parsed, at(1_700_000_000));
    }

    #[test]
    fn test_parse_iso_round_trip_format() {
        let parsed = parse_timestamp("2023-11-14T22:13:20.0000000Z").unwrap();
        assert_eq!(parsed, at(1_700_000_000));
    }

    #[test]
    fn test_parse_iso_without_offset_is_utc() {
        assert_eq!(parse_timestamp("2023-11-14T22:13:20"), Some(at(1_700_000_000)));
        assert_eq!(
            parse_timestamp("2023-11-14 22:13:20.5").map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_parse_garbage() {
        for value in ["", "soon", "12:00", "2023-13-45T99:00:00Z", "17000000001234567890123"] {
            assert_eq!(parse_timestamp(value), None, "parsed {:?}", value);
        }
    }

    #[test]
    fn test_window_inclusive_at_skew_boundary() {
        let window = default_window();
        let now = at(1_700_000_000);

        assert_eq!(window.check(now - Duration::minutes(5), now), Ok(()));
        assert_eq!(window.check(now + Duration::minutes(5), now), Ok(()));
    }

    #[test]
    fn test_window_one_unit_beyond_boundary() {
        let window = default_window();
        let now = at(1_700_000_000);

        assert_eq!(
            window.check(now - Duration::minutes(5) - Duration::seconds(1), now),
            Err(FailureReason::TimestampOutOfWindow)
        );
        assert_eq!(
            window.check(now + Duration::minutes(5) + Duration::seconds(1), now),
            Err(FailureReason::TimestampOutOfWindow)
        );
    }

    #[test]
    fn test_max_age_only_bounds_the_past() {
        let window = TimestampWindow::new(Duration::minutes(10), Some(Duration::minutes(2)));
        let now = at(1_700_000_000);

        assert_eq!(window.check(now - Duration::minutes(2), now), Ok(()));
        assert_eq!(
            window.check(now - Duration::minutes(3), now),
            Err(FailureReason::TimestampOutOfWindow)
        );
        // future-dated messages are still governed by skew alone
        assert_eq!(window.check(now + Duration::minutes(9), now), Ok(()));
    }

    #[test]
    fn test_validate_distinguishes_format_from_window() {
        let window = default_window();
        let now = at(1_700_000_000);

        assert_eq!(
            window.validate("yesterday", now),
            Err(FailureReason::InvalidTimestampFormat)
        );
        assert_eq!(
            window.validate("0", now),
            Err(FailureReason::TimestampOutOfWindow)
        );
        assert_eq!(window.validate("1700000000", now), Ok(now));
    }

    #[test]
    fn test_thirty_minutes_old_is_out_of_window() {
        let window = default_window();
        let now = at(1_700_000_000);
        let declared = (now - Duration::minutes(30)).timestamp().to_string();
        assert_eq!(
            window.validate(&declared, now),
            Err(FailureReason::TimestampOutOfWindow)
        );
    }
}
