//! Recognizes and parses the single in-line timestamp format used by
//! monitored services, plus the request-side formats accepted from the wire.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("unrecognized timestamp format: '{0}'")]
    Unrecognized(String),

    #[error("timestamp '{0}' does not exist in the configured timezone")]
    Ambiguous(String),
}

/// Parses the leading `M/D/YYYY, H:MM:SS AM|PM` token at the very start of
/// `line`, if present. Never panics, never allocates when the result is
/// `None`, and never reads past the end of the token.
///
/// `tz` is the process-local (or configured-override) IANA timezone the
/// token is interpreted in.
pub fn parse_leading_timestamp(line: &str, tz: &Tz) -> Option<i64> {
    let bytes = line.as_bytes();
    let mut cur = Cursor { bytes, pos: 0 };

    let month = cur.take_digits(1, 2)?;
    cur.take_byte(b'/')?;
    let day = cur.take_digits(1, 2)?;
    cur.take_byte(b'/')?;
    let year = cur.take_digits(4, 4)?;
    cur.take_byte(b',')?;
    cur.take_byte(b' ')?;
    let hour12 = cur.take_digits(1, 2)?;
    cur.take_byte(b':')?;
    let minute = cur.take_digits(2, 2)?;
    cur.take_byte(b':')?;
    let second = cur.take_digits(2, 2)?;
    cur.take_byte(b' ')?;
    let meridiem = cur.take_meridiem()?;

    build_instant(tz, year, month, day, hour12, minute, second, meridiem)
}

/// Parses a request-side time string: either the same locale form accepted
/// by `parse_leading_timestamp`, or ISO-8601 with an explicit offset.
pub fn parse_request_time(input: &str, tz: &Tz) -> Result<i64, TimestampError> {
    let trimmed = input.trim();

    if let Some(instant) = parse_leading_timestamp(trimmed, tz) {
        return Ok(instant);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }

    Err(TimestampError::Unrecognized(trimmed.to_string()))
}

fn build_instant(
    tz: &Tz,
    year: u32,
    month: u32,
    day: u32,
    hour12: u32,
    minute: u32,
    second: u32,
    meridiem: Meridiem,
) -> Option<i64> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    if !(1..=12).contains(&hour12) || minute > 59 || second > 59 {
        return None;
    }

    let hour24 = match (hour12 % 12, meridiem) {
        (h, Meridiem::Am) => h,
        (h, Meridiem::Pm) => h + 12,
    };

    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;
    let naive = date.and_hms_opt(hour24, minute, second)?;

    let local = tz.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc).timestamp_millis())
}

#[derive(Clone, Copy)]
enum Meridiem {
    Am,
    Pm,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take_byte(&mut self, expected: u8) -> Option<()> {
        if self.bytes.get(self.pos) == Some(&expected) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// Consumes between `min` and `max` ASCII digits and returns their value.
    fn take_digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let start = self.pos;
        let mut count = 0;
        while count < max && self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
            count += 1;
        }
        if count < min {
            self.pos = start;
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    fn take_meridiem(&mut self) -> Option<Meridiem> {
        let slice = self.bytes.get(self.pos..self.pos + 2)?;
        let meridiem = match slice {
            b"AM" | b"am" => Meridiem::Am,
            b"PM" | b"pm" => Meridiem::Pm,
            _ => return None,
        };
        self.pos += 2;
        Some(meridiem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> Tz {
        chrono_tz::UTC
    }

    #[test]
    fn parses_basic_line() {
        let tz = utc();
        let ms = parse_leading_timestamp("11/20/2025, 11:00:00 PM hello", &tz).unwrap();
        let expected = DateTime::parse_from_rfc3339("2025-11-20T23:00:00+00:00")
            .unwrap()
            .timestamp_millis();
        assert_eq!(ms, expected);
    }

    #[test]
    fn midnight_is_twelve_am() {
        let tz = utc();
        let ms = parse_leading_timestamp("11/21/2025, 12:00:00 AM foo", &tz).unwrap();
        let expected = DateTime::parse_from_rfc3339("2025-11-21T00:00:00+00:00")
            .unwrap()
            .timestamp_millis();
        assert_eq!(ms, expected);
    }

    #[test]
    fn noon_is_twelve_pm() {
        let tz = utc();
        let ms = parse_leading_timestamp("11/21/2025, 12:00:00 PM foo", &tz).unwrap();
        let expected = DateTime::parse_from_rfc3339("2025-11-21T12:00:00+00:00")
            .unwrap()
            .timestamp_millis();
        assert_eq!(ms, expected);
    }

    #[test]
    fn rejects_continuation_lines() {
        let tz = utc();
        assert!(parse_leading_timestamp("11/21/2025, 00:30:00", &tz).is_none());
        assert!(parse_leading_timestamp("  at foo.bar(Baz.java:42)", &tz).is_none());
    }

    #[test]
    fn requires_leading_position() {
        let tz = utc();
        assert!(parse_leading_timestamp(" 11/20/2025, 11:00:00 PM hello", &tz).is_none());
    }

    #[test]
    fn requires_separators() {
        let tz = utc();
        assert!(parse_leading_timestamp("11/20/2025 11:00:00 PM hello", &tz).is_none());
        assert!(parse_leading_timestamp("11/20/2025, 11:00:00PM hello", &tz).is_none());
    }

    #[test]
    fn request_time_accepts_rfc3339() {
        let tz = utc();
        let ms = parse_request_time("2025-11-20T23:00:00Z", &tz).unwrap();
        let expected = DateTime::parse_from_rfc3339("2025-11-20T23:00:00+00:00")
            .unwrap()
            .timestamp_millis();
        assert_eq!(ms, expected);
    }

    #[test]
    fn request_time_accepts_locale_form() {
        let tz = utc();
        let ms = parse_request_time("11/20/2025, 11:30:00 PM", &tz).unwrap();
        let expected = DateTime::parse_from_rfc3339("2025-11-20T23:30:00+00:00")
            .unwrap()
            .timestamp_millis();
        assert_eq!(ms, expected);
    }

    #[test]
    fn request_time_rejects_garbage() {
        let tz = utc();
        assert!(parse_request_time("not a time", &tz).is_err());
    }
}
