//! Poverty / indigency basket loader (CBA = food basket, CBT = total basket).
//!
//! The source is a monthly CSV from datos.gob.ar with an `indice_tiempo`
//! date column followed by numeric columns.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::dates::parse_date_text;
use crate::normalizer::NormalizedTable;
use crate::numeric::CoercionReport;
use crate::sheet::Cell;
use crate::timeseries::{Column, TableError, TimeSeriesTable};

pub const TIME_INDEX_COLUMN: &str = "indice_tiempo";

#[derive(Error, Debug)]
pub enum BasketError {
    #[error("Failed to read basket CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Basket CSV has no indice_tiempo column")]
    MissingTimeColumn,

    #[error("Invalid date {raw:?} on line {line}")]
    InvalidDate { line: usize, raw: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn parse_basket_csv(bytes: &[u8]) -> Result<NormalizedTable, BasketError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let time_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(TIME_INDEX_COLUMN))
        .ok_or(BasketError::MissingTimeColumn)?;

    let value_cols: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != time_col)
        .map(|(i, h)| (i, h.as_str()))
        .collect();

    let mut coercion = CoercionReport::default();
    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_date = record.get(time_col).unwrap_or_default();
        let date = parse_date_text(raw_date).ok_or_else(|| BasketError::InvalidDate {
            line: line + 2,
            raw: raw_date.to_string(),
        })?;

        let values = value_cols
            .iter()
            .map(|&(i, _)| {
                let cell = match record.get(i) {
                    Some(raw) if !raw.is_empty() => Cell::Text(raw.to_string()),
                    _ => Cell::Empty,
                };
                coercion.coerce(&cell)
            })
            .collect();
        rows.push((date, values));
    }

    let total = rows.len();
    rows.sort_by_key(|(date, _)| *date);
    rows.dedup_by_key(|(date, _)| *date);
    if rows.len() < total {
        warn!("Dropped {} repeated basket dates", total - rows.len());
    }
    coercion.log("basket CSV");

    let dates = rows.iter().map(|(date, _)| *date).collect();
    let columns = value_cols
        .iter()
        .enumerate()
        .map(|(pos, (_, name))| {
            Column::new(*name, rows.iter().map(|(_, values)| values[pos]).collect())
        })
        .collect();

    let table = TimeSeriesTable::new(dates, columns)?;
    info!(
        "Loaded basket table with {} series x {} months",
        table.width(),
        table.len()
    );

    Ok(NormalizedTable {
        table,
        coercion,
        dropped_notes: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_basket_csv() {
        let csv = "indice_tiempo,cba,cbt\n2023-01-01,100.5,220.3\n2023-02-01,110.2,235.4";
        let table = parse_basket_csv(csv.as_bytes()).unwrap().table;
        assert_eq!(table.len(), 2);
        assert_eq!(table.value_at("cba", ymd(2023, 1, 1)), Some(100.5));
        assert_eq!(table.value_at("cbt", ymd(2023, 2, 1)), Some(235.4));
    }

    #[test]
    fn test_unsorted_duplicates_and_blanks() {
        let csv = "indice_tiempo,cba,cbt\n2023-02-01,110,\n2023-01-01,100,200\n2023-02-01,999,999";
        let normalized = parse_basket_csv(csv.as_bytes()).unwrap();
        let table = normalized.table;
        assert_eq!(table.dates(), &[ymd(2023, 1, 1), ymd(2023, 2, 1)]);
        assert_eq!(table.value_at("cba", ymd(2023, 2, 1)), Some(110.0));
        assert!(table.value_at("cbt", ymd(2023, 2, 1)).unwrap().is_nan());
        assert!(normalized.coercion.is_clean());
    }

    #[test]
    fn test_missing_time_column() {
        let result = parse_basket_csv(b"fecha,cba\n2023-01-01,1");
        assert!(matches!(result, Err(BasketError::MissingTimeColumn)));
    }

    #[test]
    fn test_invalid_date() {
        let result = parse_basket_csv(b"indice_tiempo,cba\nsomeday,1");
        match result {
            Err(BasketError::InvalidDate { line, raw }) => {
                assert_eq!(line, 2);
                assert_eq!(raw, "someday");
            }
            other => panic!("Expected InvalidDate, got {other:?}"),
        }
    }
}
