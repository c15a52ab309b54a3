//! Date helpers shared by the locator, normalizer and variation engine.
//!
//! Header cells in the source spreadsheets show up as real Excel dates, raw
//! serial numbers, ISO strings, day-first strings or Spanish/English
//! month abbreviations ("ene-17", "Dic 2016"), depending on the release.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::sheet::Cell;

/// Plausible window for a bare number to be read as an Excel date serial
/// (1954-10-03 ..= 2119-01-10). Keeps index values and years out.
const SERIAL_WINDOW: std::ops::RangeInclusive<f64> = 20_000.0..=80_000.0;

/// Bare numbers like "100" would otherwise parse as year 100
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

const FULL_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// Convert an Excel date serial to a date (1900 date system)
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch: 1899-12-30 (adjusted for Excel's off-by-one bug)
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial as i64))
}

/// Try to read a header cell as a date
pub fn parse_header_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) if SERIAL_WINDOW.contains(n) => excel_serial_to_date(*n),
        Cell::Text(s) => parse_date_text(s),
        _ => None,
    }
}

/// Parse date text in any of the formats seen in the source headers.
/// Month-only formats resolve to the first day of the month.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    parse_any_format(raw).filter(|d| PLAUSIBLE_YEARS.contains(&d.year()))
}

fn parse_any_format(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_end_matches('*').trim();
    if s.is_empty() {
        return None;
    }

    for fmt in FULL_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // month/year numeric forms: 03/2017, 03-2017, 2017-03
    if let Ok(d) = NaiveDate::parse_from_str(&format!("01/{}", s.replace('-', "/")), "%d/%m/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Some(d);
    }

    parse_month_name(s)
}

/// "ene-17", "Dic 2016", "sept.2020", "Jan-2017"
fn parse_month_name(s: &str) -> Option<NaiveDate> {
    let mut parts = s
        .split(|c: char| c == '-' || c == ' ' || c == '/' || c == '.')
        .filter(|p| !p.is_empty());
    let month_token = parts.next()?;
    let year_token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let month = month_from_name(month_token)?;
    let year = match year_token.len() {
        2 => 2000 + year_token.parse::<i32>().ok()?,
        4 => year_token.parse::<i32>().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_from_name(token: &str) -> Option<u32> {
    let prefix: String = token.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "ene" | "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "abr" | "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" | "aug" => 8,
        "sep" | "set" => 9,
        "oct" => 10,
        "nov" => 11,
        "dic" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Shift a date by a (possibly negative) number of calendar months
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Whole calendar months from `earlier` to `later`, ignoring the day
pub fn month_gap(earlier: NaiveDate, later: NaiveDate) -> i32 {
    (later.year() - earlier.year()) * 12 + (later.month() as i32 - earlier.month() as i32)
}
