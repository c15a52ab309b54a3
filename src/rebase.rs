//! Rebaser: nominal → real values anchored at a base date.
//!
//! `real = nominal * (base_value / aligned_index)`, with the index
//! forward-filled onto the nominal axis. The factor is exactly 1.0 wherever the
//! aligned index equals the base value. Dates before the index starts are NaN:
//! a real value is undefined before price data exists.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::timeseries::{IndexSeries, TimeSeriesTable};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RebaseError {
    #[error("Index {index} has no values")]
    EmptyIndex { index: String },

    #[error("Base date {date} not present in index {index}")]
    MissingBaseDate { date: NaiveDate, index: String },
}

#[instrument(skip(nominal, index), fields(index = %index.name, columns = nominal.width()))]
pub fn real(
    nominal: &TimeSeriesTable,
    index: &IndexSeries,
    base_date: Option<NaiveDate>,
) -> Result<TimeSeriesTable, RebaseError> {
    let base_date = match base_date {
        Some(date) => date,
        None => index.last_date().ok_or_else(|| RebaseError::EmptyIndex {
            index: index.name.clone(),
        })?,
    };
    let base_value = index
        .value_at(base_date)
        .ok_or_else(|| RebaseError::MissingBaseDate {
            date: base_date,
            index: index.name.clone(),
        })?;

    let aligned = index.forward_fill_onto(nominal.dates());
    let uncovered = aligned.iter().filter(|v| v.is_nan()).count();
    if uncovered > 0 {
        debug!(
            "{} of {} dates precede index {} and stay undefined",
            uncovered,
            aligned.len(),
            index.name
        );
    }
    debug!("Rebasing to {} (index value {})", base_date, base_value);

    Ok(nominal.map_columns(|_, values| {
        values
            .iter()
            .zip(&aligned)
            .map(|(nominal, idx)| nominal * (base_value / idx))
            .collect()
    }))
}
