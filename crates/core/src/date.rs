//! Locale date parsing.
//!
//! Each court system prints dates its own way. All of them are wall-clock
//! times in Bahia, which does not observe daylight saving, so every parsed
//! instant carries a fixed UTC−03:00 offset.

use std::sync::LazyLock;

use regex::Regex;
use time::macros::offset;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::{Result, ScrapeError};

static PREPOSITIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(de )|(às )|( h\b)").unwrap());
static EMBEDDED_EXTENDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d{1,2} de [a-zç]+ de (\d{4}|\d{2}) às \d{1,2}:\d{1,2}(:\d{1,2})?").unwrap()
});

/// Offset applied to every court date.
pub const COURT_OFFSET: UtcOffset = offset!(-3);

/// The textual date forms found across the supported systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `01/12/2023`, `01/12/23` or `01/12/2023 14:30`.
    Numeric,
    /// `01 dez 2023` or `01 dez. 2023`.
    AbbreviatedMonth,
    /// `1 de Dezembro de 2023 às 14:30 h`.
    ExtendedPortuguese,
}

impl DateFormat {
    /// Parses `date`, with an optional separate `HH:MM[:SS]` time.
    ///
    /// The time defaults to midnight (or to a time embedded in `date` for
    /// the numeric and extended forms).
    ///
    /// # Example
    ///
    /// ```rust
    /// use juscrape_core::date::DateFormat;
    /// use time::format_description::well_known::Rfc3339;
    ///
    /// let instant = DateFormat::Numeric.parse("01/12/2023", Some("14:30")).unwrap();
    /// assert_eq!(instant.format(&Rfc3339).unwrap(), "2023-12-01T14:30:00-03:00");
    /// ```
    pub fn parse(self, date: &str, time: Option<&str>) -> Result<OffsetDateTime> {
        let invalid = || ScrapeError::InvalidDate(date.trim().to_string());

        let (day, month, year, embedded) = match self {
            DateFormat::Numeric => parse_numeric(date),
            DateFormat::AbbreviatedMonth => parse_abbreviated(date),
            DateFormat::ExtendedPortuguese => parse_extended(date),
        }
        .ok_or_else(invalid)?;

        let clock = match time.or(embedded.as_deref()) {
            Some(clock) => parse_clock(clock).ok_or_else(invalid)?,
            None => Time::MIDNIGHT,
        };

        let month = Month::try_from(month).map_err(|_| invalid())?;
        let day = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
        Ok(PrimitiveDateTime::new(day, clock).assume_offset(COURT_OFFSET))
    }
}

type Parts = (u8, u8, i32, Option<String>);

fn parse_numeric(date: &str) -> Option<Parts> {
    let mut pieces = date.split_whitespace();
    let calendar = pieces.next()?;
    let embedded = pieces.next().map(str::to_string);

    let fields: Vec<&str> = calendar.split('/').collect();
    let [day, month, year] = fields.as_slice() else {
        return None;
    };
    Some((day.parse().ok()?, month.parse().ok()?, full_year(year)?, embedded))
}

fn parse_abbreviated(date: &str) -> Option<Parts> {
    let fields: Vec<&str> = date.split_whitespace().collect();
    let [day, month, year, ..] = fields.as_slice() else {
        return None;
    };
    let month = month.trim_end_matches('.').to_lowercase();
    let month = match month.as_str() {
        "jan" => 1,
        "fev" => 2,
        "mar" => 3,
        "abr" => 4,
        "mai" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" => 8,
        "set" => 9,
        "out" => 10,
        "nov" => 11,
        "dez" => 12,
        _ => return None,
    };
    Some((day.parse().ok()?, month, full_year(year)?, None))
}

fn parse_extended(date: &str) -> Option<Parts> {
    let bare = PREPOSITIONS.replace_all(date.trim(), "").replace(':', " ");
    let fields: Vec<&str> = bare.split_whitespace().collect();

    let (day, month, year) = match fields.as_slice() {
        [day, month, year, ..] => (*day, *month, *year),
        _ => return None,
    };
    let month = month_number(month)?;
    let embedded = match &fields[3..] {
        [hour, minute, second, ..] => Some(format!("{}:{}:{}", hour, minute, second)),
        [hour, minute] => Some(format!("{}:{}", hour, minute)),
        _ => None,
    };
    Some((day.parse().ok()?, month, full_year(year)?, embedded))
}

fn month_number(name: &str) -> Option<u8> {
    let month = match name.to_lowercase().as_str() {
        "janeiro" => 1,
        "fevereiro" => 2,
        "março" | "marco" => 3,
        "abril" => 4,
        "maio" => 5,
        "junho" => 6,
        "julho" => 7,
        "agosto" => 8,
        "setembro" => 9,
        "outubro" => 10,
        "novembro" => 11,
        "dezembro" => 12,
        _ => return None,
    };
    Some(month)
}

fn full_year(year: &str) -> Option<i32> {
    let value: i32 = year.trim().parse().ok()?;
    if year.trim().len() == 2 { Some(2000 + value) } else { Some(value) }
}

fn parse_clock(clock: &str) -> Option<Time> {
    let fields: Vec<u8> = clock
        .trim()
        .split(':')
        .map(|f| f.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;
    match fields.as_slice() {
        [hour, minute] => Time::from_hms(*hour, *minute, 0).ok(),
        [hour, minute, second] => Time::from_hms(*hour, *minute, *second).ok(),
        _ => None,
    }
}

/// Finds the first extended Portuguese date inside free text.
///
/// Hearing notices carry their schedule this way, e.g. "designada para
/// 12 de Março de 2024 às 09:00".
pub fn find_extended_date(text: &str) -> Option<OffsetDateTime> {
    let found = EMBEDDED_EXTENDED.find(text)?;
    DateFormat::ExtendedPortuguese.parse(found.as_str(), None).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[test]
    fn test_numeric_with_separate_time() {
        let parsed = DateFormat::Numeric.parse("01/12/2023", Some("14:30")).unwrap();
        assert_eq!(parsed, datetime!(2023-12-01 14:30 -3));
        assert_eq!(parsed.offset(), COURT_OFFSET);
    }

    #[rstest]
    #[case(DateFormat::Numeric, "05/03/2021", datetime!(2021-03-05 0:00 -3))]
    #[case(DateFormat::Numeric, "05/03/21 08:15", datetime!(2021-03-05 8:15 -3))]
    #[case(DateFormat::Numeric, " 31/01/2024 23:59:58 ", datetime!(2024-01-31 23:59:58 -3))]
    #[case(DateFormat::AbbreviatedMonth, "10 jan 2023", datetime!(2023-01-10 0:00 -3))]
    #[case(DateFormat::AbbreviatedMonth, "10 FEV. 2023", datetime!(2023-02-10 0:00 -3))]
    #[case(DateFormat::ExtendedPortuguese, "7 de Março de 2022 às 9:05 h", datetime!(2022-03-07 9:05 -3))]
    #[case(DateFormat::ExtendedPortuguese, "17 de marco de 2022 às 10:00:30", datetime!(2022-03-17 10:00:30 -3))]
    #[case(DateFormat::ExtendedPortuguese, "01 de Dezembro de 2023", datetime!(2023-12-01 0:00 -3))]
    fn test_formats(#[case] format: DateFormat, #[case] input: &str, #[case] expected: OffsetDateTime) {
        assert_eq!(format.parse(input, None).unwrap(), expected);
    }

    #[test]
    fn test_separate_time_wins() {
        let parsed = DateFormat::AbbreviatedMonth.parse("02 out 2020", Some("16:45")).unwrap();
        assert_eq!(parsed, datetime!(2020-10-02 16:45 -3));
    }

    #[rstest]
    #[case(DateFormat::Numeric, "2023-12-01")]
    #[case(DateFormat::Numeric, "31/02/2023")]
    #[case(DateFormat::AbbreviatedMonth, "10 xyz 2023")]
    #[case(DateFormat::ExtendedPortuguese, "ontem")]
    fn test_invalid(#[case] format: DateFormat, #[case] input: &str) {
        assert!(matches!(format.parse(input, None), Err(ScrapeError::InvalidDate(_))));
    }

    #[test]
    fn test_invalid_time() {
        assert!(DateFormat::Numeric.parse("01/12/2023", Some("25:00")).is_err());
    }

    #[test]
    fn test_find_extended_date() {
        let text = "Audiência de conciliação designada para 12 de Março de 2024 às 09:00 h, na sala 3.";
        assert_eq!(find_extended_date(text), Some(datetime!(2024-03-12 9:00 -3)));
        assert_eq!(find_extended_date("sem data"), None);
    }
}
