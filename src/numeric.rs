//! Locale-aware numeric coercion for spreadsheet cells.
//!
//! Source tables mix real numeric cells with text such as `"$ 1.234.567,89"`
//! (es-AR: `.` thousands, `,` decimal) and plain `"146.41"`. A cell that
//! cannot be read is not fatal: callers record it in a [`CoercionReport`]
//! and store NaN.

use thiserror::Error;
use tracing::warn;

use crate::sheet::Cell;

const CURRENCY_MARKERS: &[&str] = &["AR$", "ARS", "US$", "$"];
const MAX_EXAMPLES: usize = 5;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot coerce {raw:?} to a number")]
pub struct CoercionError {
    pub raw: String,
}

impl CoercionError {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
        }
    }
}

/// Coerce a cell; blanks are missing values (NaN), not failures
pub fn coerce_cell(cell: &Cell) -> Result<f64, CoercionError> {
    match cell {
        Cell::Empty => Ok(f64::NAN),
        Cell::Number(n) => Ok(*n),
        Cell::Text(s) => parse_locale_number(s),
        Cell::Date(d) => Err(CoercionError::new(&d.to_string())),
    }
}

pub fn parse_locale_number(raw: &str) -> Result<f64, CoercionError> {
    let mut s: String = raw.trim().to_string();
    let mut money = false;
    for marker in CURRENCY_MARKERS {
        if s.contains(marker) {
            money = true;
            s = s.replace(marker, "");
        }
    }
    let s: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    if s.is_empty() {
        return if raw.trim().is_empty() {
            Ok(f64::NAN)
        } else {
            Err(CoercionError::new(raw))
        };
    }

    let normalized = normalize_separators(&s, money).ok_or_else(|| CoercionError::new(raw))?;

    let valid = normalized.chars().any(|c| c.is_ascii_digit())
        && normalized
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+')));
    if !valid {
        return Err(CoercionError::new(raw));
    }

    normalized
        .parse::<f64>()
        .map_err(|_| CoercionError::new(raw))
}

/// Rewrite digit grouping into a plain `1234.56` form.
///
/// With both separators present the last one is the decimal mark. A lone
/// `,` is decimal and a repeated separator is grouping. A lone `.` is
/// grouping when it reads as es-AR thousands (see [`is_thousands_dot`]),
/// decimal otherwise.
fn normalize_separators(s: &str, money: bool) -> Option<String> {
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    match (dots, commas) {
        (1, 0) if is_thousands_dot(s, money) => Some(s.replace('.', "")),
        (0, 0) | (1, 0) => Some(s.to_string()),
        (_, 0) => Some(s.replace('.', "")),
        (0, 1) => Some(s.replace(',', ".")),
        (0, _) => Some(s.replace(',', "")),
        _ => {
            let last_dot = s.rfind('.')?;
            let last_comma = s.rfind(',')?;
            if last_comma > last_dot {
                (commas == 1).then(|| s.replace('.', "").replace(',', "."))
            } else {
                (dots == 1).then(|| s.replace(',', ""))
            }
        }
    }
}

/// `"45.000"`: exactly three digits after the dot and an integer part of one
/// to three digits. Outside money text a leading 0 keeps it decimal.
fn is_thousands_dot(s: &str, money: bool) -> bool {
    let Some((int_part, frac)) = s.trim_start_matches(['-', '+']).split_once('.') else {
        return false;
    };
    frac.len() == 3
        && frac.chars().all(|c| c.is_ascii_digit())
        && (1..=3).contains(&int_part.len())
        && int_part.chars().all(|c| c.is_ascii_digit())
        && (money || !int_part.starts_with('0'))
}

/// Count of cells that failed coercion while building one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercionReport {
    pub failed: usize,
    /// First few offending raw values, for log messages
    pub examples: Vec<String>,
}

impl CoercionReport {
    /// Coerce a cell, recording a failure and returning NaN in its place
    pub fn coerce(&mut self, cell: &Cell) -> f64 {
        match coerce_cell(cell) {
            Ok(v) => v,
            Err(e) => {
                self.record(e);
                f64::NAN
            }
        }
    }

    pub fn record(&mut self, error: CoercionError) {
        self.failed += 1;
        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push(error.raw);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn merge(&mut self, other: CoercionReport) {
        self.failed += other.failed;
        for example in other.examples {
            if self.examples.len() < MAX_EXAMPLES {
                self.examples.push(example);
            }
        }
    }

    /// Emit a warning when any cell was replaced by NaN
    pub fn log(&self, table: &str) {
        if !self.is_clean() {
            warn!(
                "{} cells in {} could not be read as numbers and were set to NaN (e.g. {:?})",
                self.failed, table, self.examples
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_locale_number("146.41").unwrap(), 146.41);
        assert_eq!(parse_locale_number("100").unwrap(), 100.0);
        assert_eq!(parse_locale_number("-3,5").unwrap(), -3.5);
    }

    #[test]
    fn test_es_ar_grouping_and_currency() {
        assert_eq!(parse_locale_number("$ 1.234.567,89").unwrap(), 1234567.89);
        assert_eq!(parse_locale_number("$1.234,5").unwrap(), 1234.5);
        assert_eq!(parse_locale_number("1.234.567").unwrap(), 1234567.0);
        assert_eq!(parse_locale_number("ARS 250.000,00").unwrap(), 250000.0);
        assert_eq!(parse_locale_number("$ 45.000").unwrap(), 45000.0);
        assert_eq!(parse_locale_number("45.000").unwrap(), 45000.0);
        assert_eq!(parse_locale_number("-1.500").unwrap(), -1500.0);
    }

    #[test]
    fn test_lone_dot_stays_decimal_unless_grouped() {
        assert_eq!(parse_locale_number("0.500").unwrap(), 0.5);
        assert_eq!(parse_locale_number("45.5").unwrap(), 45.5);
        assert_eq!(parse_locale_number("$ 45.50").unwrap(), 45.5);
        assert_eq!(parse_locale_number("1234.567").unwrap(), 1234.567);
    }

    #[test]
    fn test_en_grouping() {
        assert_eq!(parse_locale_number("1,234,567.89").unwrap(), 1234567.89);
        assert_eq!(parse_locale_number("1,234,567").unwrap(), 1234567.0);
    }

    #[test]
    fn test_non_breaking_space() {
        assert_eq!(parse_locale_number("1\u{a0}234,5").unwrap(), 1234.5);
    }

    #[test]
    fn test_failures() {
        assert!(parse_locale_number("s/d").is_err());
        assert!(parse_locale_number("-").is_err());
        assert!(parse_locale_number("NaN").is_err());
        assert!(parse_locale_number("inf").is_err());
        assert!(parse_locale_number("1,2,3.4,5").is_err());
        assert!(parse_locale_number("$").is_err());
    }

    #[test]
    fn test_blank_is_missing_not_failure() {
        assert!(parse_locale_number("   ").unwrap().is_nan());
        assert!(coerce_cell(&Cell::Empty).unwrap().is_nan());
    }

    #[test]
    fn test_report_counts_and_caps_examples() {
        let mut report = CoercionReport::default();
        for _ in 0..7 {
            assert!(report.coerce(&Cell::Text("n/d".to_string())).is_nan());
        }
        assert_eq!(report.coerce(&Cell::Number(2.0)), 2.0);
        assert_eq!(report.failed, 7);
        assert_eq!(report.examples.len(), MAX_EXAMPLES);
        assert!(!report.is_clean());
    }
}
