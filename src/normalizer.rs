//! Table Normalizer for quarterly wide tables (one row per jurisdiction, one
//! column per quarter).
//!
//! Header text of these tables changes format from release to release, but
//! the column cadence does not, so the date axis is synthesized from a known
//! anchor date with a fixed three-month step.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::dates::add_months;
use crate::labels::LabelRules;
use crate::locator::SheetRegion;
use crate::numeric::CoercionReport;
use crate::sheet::RawSheet;
use crate::timeseries::{Column, TableError, TimeSeriesTable};

const QUARTER_MONTHS: i32 = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("No labeled data rows below header row {header_row} in sheet {sheet}")]
    NoDataRows { sheet: String, header_row: usize },

    #[error("Date axis overflows starting at {0}")]
    DateOverflow(NaiveDate),

    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone)]
pub struct QuarterlyTableOptions {
    /// Date of the label column position; data column `j` (1-based) is
    /// `anchor_date + 3*j` months
    pub anchor_date: NaiveDate,
    pub label_rules: LabelRules,
}

impl QuarterlyTableOptions {
    pub fn new(anchor_date: NaiveDate) -> Self {
        Self {
            anchor_date,
            label_rules: LabelRules::footnotes(),
        }
    }
}

/// A canonical table plus what was lost building it
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub table: TimeSeriesTable,
    pub coercion: CoercionReport,
    /// Raw labels of the trailing notes rows that were dropped
    pub dropped_notes: Vec<String>,
}

/// Quarterly axis for `data_columns` columns: `data_columns + 1` points
/// starting at the anchor (which stands for the label column)
pub fn quarterly_axis(anchor: NaiveDate, data_columns: usize) -> Option<Vec<NaiveDate>> {
    (0..=data_columns)
        .map(|step| add_months(anchor, QUARTER_MONTHS * step as i32))
        .collect()
}

#[instrument(skip(sheet, region, options), fields(sheet = %sheet.name()))]
pub fn normalize_quarterly(
    sheet: &RawSheet,
    region: &SheetRegion,
    options: &QuarterlyTableOptions,
) -> Result<NormalizedTable, NormalizeError> {
    let data_cols: Vec<usize> = region.data_columns().collect();
    let axis = quarterly_axis(options.anchor_date, data_cols.len())
        .ok_or(NormalizeError::DateOverflow(options.anchor_date))?;
    let dates = axis[1..].to_vec();

    // Rows with a blank label are spacing or totals, not data
    let mut labeled_rows: Vec<(usize, String)> = (region.header_row + 1..sheet.height())
        .filter_map(|row| sheet.text(row, region.label_col).map(|label| (row, label)))
        .collect();

    let keep = labeled_rows
        .len()
        .saturating_sub(region.trailing_rows_to_drop);
    let dropped_notes: Vec<String> = labeled_rows
        .split_off(keep)
        .into_iter()
        .map(|(_, label)| label)
        .collect();
    if !dropped_notes.is_empty() {
        debug!("Dropped {} trailing notes rows", dropped_notes.len());
    }

    if labeled_rows.is_empty() {
        return Err(NormalizeError::NoDataRows {
            sheet: sheet.name().to_string(),
            header_row: region.header_row,
        });
    }

    let mut coercion = CoercionReport::default();
    let mut columns: Vec<Column> = Vec::with_capacity(labeled_rows.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (row, raw_label) in labeled_rows {
        let name = options.label_rules.apply(&raw_label);
        let values: Vec<f64> = data_cols
            .iter()
            .map(|&col| coercion.coerce(sheet.get(row, col)))
            .collect();

        // Later rows overwrite earlier ones that clean to the same name,
        // keeping the first position
        match positions.get(&name) {
            Some(&pos) => {
                warn!(
                    "Label {:?} (row {}) collides with an earlier row; keeping the later values",
                    raw_label, row
                );
                columns[pos].values = values;
            }
            None => {
                positions.insert(name.clone(), columns.len());
                columns.push(Column::new(name, values));
            }
        }
    }

    coercion.log(sheet.name());

    let table = TimeSeriesTable::new(dates, columns)?;
    info!(
        "Normalized {} series x {} quarters from sheet {}",
        table.width(),
        table.len(),
        sheet.name()
    );

    Ok(NormalizedTable {
        table,
        coercion,
        dropped_notes,
    })
}
