//! Calendar timestamps and their ISO-8601 text form.
//!
//! Dates use the proleptic Gregorian calendar in UTC, formatted as
//! `YYYY-MM-DDTHH:MM:SS.mmmZ`. Years outside `0..=9999` use the extended
//! signed form with at least six digits (`+010000-01-01T00:00:00.000Z`).
//! Every `i64` millisecond value has a text form that parses back to it.

const MS_PER_DAY: i64 = 86_400_000;

/// Extended years carry at least six digits; nine cover the whole `i64` range.
const EXTENDED_YEAR_DIGITS: std::ops::RangeInclusive<usize> = 6..=9;

/// A point in time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    #[must_use]
    pub const fn millis(self) -> i64 {
        self.millis
    }

    /// Format as an ISO-8601 UTC string with millisecond precision.
    #[must_use]
    pub fn to_iso(self) -> String {
        let days = self.millis.div_euclid(MS_PER_DAY);
        let ms_of_day = self.millis.rem_euclid(MS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        let hour = ms_of_day / 3_600_000;
        let minute = (ms_of_day / 60_000) % 60;
        let second = (ms_of_day / 1000) % 60;
        let ms = ms_of_day % 1000;

        let year = if (0..=9999).contains(&year) {
            format!("{year:04}")
        } else if year < 0 {
            format!("-{:06}", -year)
        } else {
            format!("+{year:06}")
        };

        format!("{year}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{ms:03}Z")
    }

    /// Parse the format produced by [`Timestamp::to_iso`].
    ///
    /// The fractional part is optional and may have any number of digits;
    /// digits past milliseconds are truncated. Only the `Z` zone is accepted.
    #[must_use]
    pub fn parse_iso(s: &str) -> Option<Self> {
        let (year, rest) = match s.as_bytes().first()? {
            sign @ (b'+' | b'-') => {
                let end = s.get(1..)?.find('-')? + 1;
                if !EXTENDED_YEAR_DIGITS.contains(&(end - 1)) {
                    return None;
                }
                let magnitude = parse_fixed(s.get(1..end)?)?;
                let year = if *sign == b'-' { -magnitude } else { magnitude };
                (year, s.get(end..)?)
            }
            _ => (parse_fixed(s.get(0..4)?)?, s.get(4..)?),
        };

        let b = rest.as_bytes();
        if b.len() < 16 || b[0] != b'-' || b[3] != b'-' || b[6] != b'T' || b[9] != b':' || b[12] != b':'
        {
            return None;
        }
        let month = parse_fixed(rest.get(1..3)?)?;
        let day = parse_fixed(rest.get(4..6)?)?;
        let hour = parse_fixed(rest.get(7..9)?)?;
        let minute = parse_fixed(rest.get(10..12)?)?;
        let second = parse_fixed(rest.get(13..15)?)?;

        let tail = rest.get(15..)?;
        let (fraction, zone) = match tail.strip_prefix('.') {
            Some(f) => {
                let end = f.find(|c: char| !c.is_ascii_digit()).unwrap_or(f.len());
                if end == 0 {
                    return None;
                }
                (&f[..end], &f[end..])
            }
            None => ("", tail),
        };
        if zone != "Z" {
            return None;
        }

        let ms = fraction
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(3)
            .fold(0i64, |acc, d| acc * 10 + i64::from(d - b'0'));

        if !(1..=12).contains(&month)
            || day < 1
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return None;
        }

        let days = i128::from(days_from_civil(year, month, day));
        let ms_of_day = i128::from(hour * 3_600_000 + minute * 60_000 + second * 1000 + ms);
        let millis = days * i128::from(MS_PER_DAY) + ms_of_day;
        i64::try_from(millis).ok().map(Self::from_millis)
    }
}

fn parse_fixed(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 for a civil date (Howard Hinnant's algorithm).
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let yy = if m <= 2 { y - 1 } else { y };
    let mm = if m <= 2 { m + 9 } else { m - 3 };
    let era = yy.div_euclid(400);
    let yoe = yy - era * 400; // [0, 399]
    let doy = (153 * mm + 2) / 5 + d - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    era * 146_097 + doe - 719_468
}

/// Inverse of `days_from_civil`.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_formats() {
        assert_eq!(
            Timestamp::from_millis(0).to_iso(),
            "1970-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn known_instant() {
        // 2024-02-29T12:34:56.789Z
        let ts = Timestamp::from_millis(1_709_210_096_789);
        assert_eq!(ts.to_iso(), "2024-02-29T12:34:56.789Z");
        assert_eq!(Timestamp::parse_iso("2024-02-29T12:34:56.789Z"), Some(ts));
    }

    #[test]
    fn before_epoch() {
        let ts = Timestamp::from_millis(-1);
        assert_eq!(ts.to_iso(), "1969-12-31T23:59:59.999Z");
        assert_eq!(Timestamp::parse_iso(&ts.to_iso()), Some(ts));
    }

    #[test]
    fn extended_years() {
        let ts = Timestamp::from_millis(8_640_000_000_000_000);
        assert_eq!(ts.to_iso(), "+275760-09-13T00:00:00.000Z");
        assert_eq!(Timestamp::parse_iso(&ts.to_iso()), Some(ts));

        let early = Timestamp::from_millis(-62_198_755_200_000);
        assert!(early.to_iso().starts_with("-000001"));
        assert_eq!(Timestamp::parse_iso(&early.to_iso()), Some(early));
    }

    #[test]
    fn years_past_six_digits() {
        let ts = Timestamp::from_millis(40_000_000_000_000_000);
        assert_eq!(ts.to_iso(), "+1269519-07-17T23:06:40.000Z");
        assert_eq!(Timestamp::parse_iso(&ts.to_iso()), Some(ts));

        for millis in [i64::MAX, i64::MIN, -40_000_000_000_000_000] {
            let ts = Timestamp::from_millis(millis);
            assert_eq!(Timestamp::parse_iso(&ts.to_iso()), Some(ts), "{millis}");
        }
    }

    #[test]
    fn rejects_out_of_range_years() {
        assert_eq!(Timestamp::parse_iso("+10000-01-01T00:00:00.000Z"), None);
        assert_eq!(Timestamp::parse_iso("+1000000000-01-01T00:00:00.000Z"), None);
        assert_eq!(Timestamp::parse_iso("+999999999-01-01T00:00:00.000Z"), None);
    }

    #[test]
    fn fraction_is_optional() {
        assert_eq!(
            Timestamp::parse_iso("1970-01-01T00:00:01Z"),
            Some(Timestamp::from_millis(1000))
        );
        assert_eq!(
            Timestamp::parse_iso("1970-01-01T00:00:00.5Z"),
            Some(Timestamp::from_millis(500))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Timestamp::parse_iso(""), None);
        assert_eq!(Timestamp::parse_iso("yesterday"), None);
        assert_eq!(Timestamp::parse_iso("2023-02-29T00:00:00.000Z"), None);
        assert_eq!(Timestamp::parse_iso("2023-01-01T00:00:00.000+01:00"), None);
        assert_eq!(Timestamp::parse_iso("2023-01-01T00:00:00.Z"), None);
    }
}
