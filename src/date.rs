//! Parsing of the HTTP-dates found in the `Expires` attribute of a `Set-Cookie` header.
//!
//! The two fixed-width shapes that servers overwhelmingly emit are decoded with
//! explicit calendar arithmetic:
//!
//! ```text
//! Sun, 06 Nov 1994 08:49:37 GMT   ; RFC 822, updated by RFC 1123 (29 bytes)
//! Sun Nov  6 08:49:37 1994        ; ANSI C's asctime() format (24 bytes)
//! ```
//!
//! Anything else is handed over to the general-purpose parser of the [`time`] crate.
//! A fixed-width date whose fields fail to decode gets a second chance too: runs of
//! whitespace are collapsed and the date is parsed with layouts that accept unpadded
//! days and hours.
use time::format_description::well_known::Rfc2822;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_MINUTE: i64 = 60;

// Both layouts expect single spaces between fields.
static LENIENT_RFC1123: &[FormatItem<'_>] = format_description!(
    "[weekday repr:short], [day padding:none] [month repr:short] [year] [hour padding:none]:[minute]:[second] GMT"
);
static LENIENT_ASCTIME: &[FormatItem<'_>] = format_description!(
    "[weekday repr:short] [month repr:short] [day padding:none] [hour padding:none]:[minute]:[second] [year]"
);

/// Parse an HTTP-date into milliseconds since the Unix epoch.
///
/// Returns `None` if the date can't be understood, neither by the fixed-width
/// decoders nor by the fallback parser.
///
/// # Example
///
/// ```rust
/// use cantuccio::date::parse_http_date;
///
/// let rfc1123 = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT");
/// let asctime = parse_http_date("Sun Nov  6 08:49:37 1994");
/// assert_eq!(rfc1123, Some(784_111_777_000));
/// assert_eq!(rfc1123, asctime);
///
/// assert_eq!(parse_http_date("next tuesday"), None);
/// ```
pub fn parse_http_date(date: &str) -> Option<i64> {
    DateShape::of(date).parse(date)
}

/// The textual shapes of an HTTP-date, told apart by their byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateShape {
    /// `Sun, 06 Nov 1994 08:49:37 GMT`
    Rfc1123,
    /// `Sun Nov  6 08:49:37 1994`
    Asctime,
    /// Any other length. Only the fallback parser is attempted.
    Other,
}

impl DateShape {
    /// Determine the shape of `date`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cantuccio::date::DateShape;
    ///
    /// assert_eq!(DateShape::of("Sun, 06 Nov 1994 08:49:37 GMT"), DateShape::Rfc1123);
    /// assert_eq!(DateShape::of("Sun Nov  6 08:49:37 1994"), DateShape::Asctime);
    /// assert_eq!(DateShape::of("Sunday, 06-Nov-94 08:49:37 GMT"), DateShape::Other);
    /// ```
    pub fn of(date: &str) -> DateShape {
        match date.len() {
            29 => DateShape::Rfc1123,
            24 => DateShape::Asctime,
            _ => DateShape::Other,
        }
    }

    /// Parse `date` according to this shape, falling back to the general parser
    /// if the fixed-width decoding fails.
    pub fn parse(self, date: &str) -> Option<i64> {
        if let Some(offsets) = self.offsets() {
            if let Some(millis) = offsets.decode(date) {
                return Some(millis);
            }
            tracing::trace!(date, shape = ?self, "fixed-width date decoding failed, falling back");
        }
        self.parse_fallback(date)
    }

    fn offsets(self) -> Option<&'static FieldOffsets> {
        match self {
            DateShape::Rfc1123 => Some(&RFC1123_OFFSETS),
            DateShape::Asctime => Some(&ASCTIME_OFFSETS),
            DateShape::Other => None,
        }
    }

    fn parse_fallback(self, date: &str) -> Option<i64> {
        let layout = match self {
            DateShape::Rfc1123 => LENIENT_RFC1123,
            DateShape::Asctime => LENIENT_ASCTIME,
            DateShape::Other => {
                return OffsetDateTime::parse(date, &Rfc2822)
                    .ok()
                    .map(|d| d.unix_timestamp() * 1000)
            }
        };
        let collapsed = date.split_whitespace().collect::<Vec<_>>().join(" ");
        let parsed = PrimitiveDateTime::parse(&collapsed, layout).map(|d| d.assume_utc());
        parsed.ok().map(|d| d.unix_timestamp() * 1000)
    }
}

/// Byte ranges, `[start, end)`, of every date component in a fixed-width shape.
#[derive(Debug)]
struct FieldOffsets {
    day: (usize, usize),
    month: (usize, usize),
    year: (usize, usize),
    hour: (usize, usize),
    minute: (usize, usize),
    second: (usize, usize),
    /// asctime pads single-digit days with a space.
    trim_day: bool,
}

static RFC1123_OFFSETS: FieldOffsets = FieldOffsets {
    day: (5, 7),
    month: (8, 11),
    year: (12, 16),
    hour: (17, 19),
    minute: (20, 22),
    second: (23, 25),
    trim_day: false,
};

static ASCTIME_OFFSETS: FieldOffsets = FieldOffsets {
    day: (8, 10),
    month: (4, 7),
    year: (20, 24),
    hour: (11, 13),
    minute: (14, 16),
    second: (17, 19),
    trim_day: true,
};

impl FieldOffsets {
    fn decode(&self, date: &str) -> Option<i64> {
        let field = |(start, end): (usize, usize)| date.get(start..end);
        let number = |span: (usize, usize)| -> Option<i64> { field(span)?.parse().ok() };

        let day = if self.trim_day {
            field(self.day)?.trim().parse().ok()?
        } else {
            number(self.day)?
        };
        let month = parse_month(field(self.month)?);
        let year = number(self.year)?;
        let hour = number(self.hour)?;
        let minute = number(self.minute)?;
        let second = number(self.second)?;
        Some(to_epoch_millis(day, month, year, hour, minute, second))
    }
}

/// Zero-based month index of a three-letter English abbreviation.
///
/// Unknown abbreviations map to January.
pub(crate) fn parse_month(abbreviation: &str) -> i64 {
    match abbreviation {
        "Jan" => 0,
        "Feb" => 1,
        "Mar" => 2,
        "Apr" => 3,
        "May" => 4,
        "Jun" => 5,
        "Jul" => 6,
        "Aug" => 7,
        "Sep" => 8,
        "Oct" => 9,
        "Nov" => 10,
        "Dec" => 11,
        _ => 0,
    }
}

pub(crate) fn is_leap_year(year: i64) -> bool {
    year % 400 == 0 || (year % 100 != 0 && year % 4 == 0)
}

/// Number of days in the zero-based `month`.
///
/// Months alternate between 31 and 30 days, with the run restarting in August.
/// February is the exception.
pub(crate) fn days_in_month(is_leap: bool, month: i64) -> i64 {
    let month = if month >= 7 { month + 1 } else { month };
    if month % 2 == 0 {
        31
    } else if month == 1 {
        if is_leap {
            29
        } else {
            28
        }
    } else {
        30
    }
}

pub(crate) fn seconds_before_year(year: i64) -> i64 {
    let diff = year - 1970;
    let (super_leap_days, ignored_leap_days) = if year >= 2000 {
        (1 + (year - 2001) / 400, 1 + (year - 2001) / 100)
    } else {
        (0, 0)
    };
    let regular_leap_days = (year - 1) / 4 - 492;
    (diff * 365 + regular_leap_days - ignored_leap_days + super_leap_days) * SECONDS_PER_DAY
}

pub(crate) fn seconds_before_month(year: i64, month: i64) -> i64 {
    let is_leap = is_leap_year(year);
    (0..month)
        .map(|m| days_in_month(is_leap, m) * SECONDS_PER_DAY)
        .sum()
}

pub(crate) fn to_epoch_millis(
    day: i64,
    month: i64,
    year: i64,
    hour: i64,
    minute: i64,
    second: i64,
) -> i64 {
    (seconds_before_year(year)
        + seconds_before_month(year, month)
        + (day - 1) * SECONDS_PER_DAY
        + hour * SECONDS_PER_HOUR
        + minute * SECONDS_PER_MINUTE
        + second)
        * 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn millis(date: OffsetDateTime) -> i64 {
        date.unix_timestamp() * 1000
    }

    #[test]
    fn both_fixed_shapes_agree_with_the_calendar() {
        let expected = millis(datetime!(1994-11-06 08:49:37 UTC));
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(expected));
        assert_eq!(expected, 784_111_777_000);
    }

    #[test]
    fn leap_years_and_century_rules() {
        let cases = [
            ("Thu, 01 Jan 1970 00:00:00 GMT", datetime!(1970-01-01 0:00 UTC)),
            ("Sat, 01 Jan 2000 00:00:00 GMT", datetime!(2000-01-01 0:00 UTC)),
            ("Tue, 29 Feb 2000 23:59:59 GMT", datetime!(2000-02-29 23:59:59 UTC)),
            ("Mon, 01 Jan 2001 00:00:00 GMT", datetime!(2001-01-01 0:00 UTC)),
            ("Thu, 29 Feb 2024 12:00:00 GMT", datetime!(2024-02-29 12:00 UTC)),
            ("Tue, 31 Dec 2024 18:30:05 GMT", datetime!(2024-12-31 18:30:05 UTC)),
            ("Mon, 01 Mar 2100 00:00:00 GMT", datetime!(2100-03-01 0:00 UTC)),
            ("Sat, 01 Jan 2101 00:00:00 GMT", datetime!(2101-01-01 0:00 UTC)),
            ("Wed, 01 Mar 2400 00:00:00 GMT", datetime!(2400-03-01 0:00 UTC)),
            ("Fri, 31 Dec 9999 23:59:59 GMT", datetime!(9999-12-31 23:59:59 UTC)),
        ];
        for (raw, expected) in cases {
            assert_eq!(parse_http_date(raw), Some(millis(expected)), "Failed for {raw}");
        }
    }

    #[test]
    fn asctime_with_two_digit_day() {
        assert_eq!(
            parse_http_date("Wed Oct 21 07:28:00 2015"),
            Some(millis(datetime!(2015-10-21 07:28:00 UTC)))
        );
    }

    #[test]
    fn unknown_month_maps_to_january() {
        assert_eq!(
            parse_http_date("Sun, 06 Foo 1994 08:49:37 GMT"),
            Some(millis(datetime!(1994-01-06 08:49:37 UTC)))
        );
    }

    #[test]
    fn other_lengths_use_the_rfc2822_fallback() {
        assert_eq!(DateShape::of("Sun, 6 Nov 1994 08:49:37 +0000"), DateShape::Other);
        assert_eq!(
            parse_http_date("Sun, 6 Nov 1994 08:49:37 +0000"),
            Some(784_111_777_000)
        );
    }

    #[test]
    fn fixed_width_dates_with_irregular_fields() {
        let expected = Some(784_111_777_000);
        let cases = [
            // Space-padded day in a 29-byte RFC 1123 date.
            ("Sun,  6 Nov 1994 08:49:37 GMT", DateShape::Rfc1123),
            ("Sun, 06 Nov 1994  8:49:37 GMT", DateShape::Rfc1123),
            ("Sun Nov 6 8:49:37   1994", DateShape::Asctime),
        ];
        for (raw, shape) in cases {
            assert_eq!(DateShape::of(raw), shape, "Failed for {raw:?}");
            assert_eq!(shape.offsets().unwrap().decode(raw), None, "Failed for {raw:?}");
            assert_eq!(parse_http_date(raw), expected, "Failed for {raw:?}");
        }
    }

    #[test]
    fn garbage_is_unset() {
        for raw in [
            "",
            "tomorrow",
            "Sun, xx Nov 1994 08:49:37 GMT",
            "Sun Nov  x 08:49:37 1994",
            "Sun, 06 Nov 1994 08:49:37 GMT and then some",
        ] {
            assert_eq!(parse_http_date(raw), None, "Expected no date for {raw:?}");
        }
    }

    #[test]
    fn non_ascii_input_does_not_panic() {
        // 29 bytes, but the offsets fall inside multi-byte characters.
        let raw = "Sun, 0é Nov 1994 08:49:37 GM";
        assert_eq!(raw.len(), 29);
        assert_eq!(parse_http_date(raw), None);
    }

    #[test]
    fn month_lengths() {
        let common: Vec<_> = (0..12).map(|m| days_in_month(false, m)).collect();
        assert_eq!(common, [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]);
        assert_eq!(days_in_month(true, 1), 29);
        assert_eq!(seconds_before_month(2023, 12), 365 * SECONDS_PER_DAY);
        assert_eq!(seconds_before_month(2024, 12), 366 * SECONDS_PER_DAY);
    }

    #[test]
    fn leap_year_rule() {
        assert!(is_leap_year(1996));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
        assert_eq!(seconds_before_year(1970), 0);
    }
}
