//! Index Series Loader: pulls the reference price index (and optionally the
//! whole category block) out of the monthly IPC workbook, whose row and
//! column layout moves between releases.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::labels::LabelRules;
use crate::locator::{
    find_anchor_row, AnchorLocator, AnchorMatch, HeaderCells, LocateError, LocatorOptions,
    SheetLocator, SheetRegion,
};
use crate::normalizer::NormalizedTable;
use crate::numeric::CoercionReport;
use crate::sheet::RawSheet;
use crate::timeseries::{Column, IndexSeries, TableError, TimeSeriesTable};

/// Prefix for category columns of the price index table
pub const CATEGORY_PREFIX: &str = "infl_";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexLoadError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("Row {anchor:?} has no positive values under its date header")]
    NoValues { anchor: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone)]
pub struct IndexSheetOptions {
    /// Label of the target row, matched exactly (trimmed, case-insensitive)
    pub series_anchor: String,
    /// Optional section heading that must precede the target row
    pub section_anchor: Option<String>,
    pub label_col_index: usize,
    pub header_row_offset: Option<usize>,
    /// Name given to the extracted series; defaults to the anchor label
    pub series_name: String,
}

impl IndexSheetOptions {
    pub fn new(series_anchor: impl Into<String>) -> Self {
        let series_anchor = series_anchor.into();
        Self {
            series_name: series_anchor.clone(),
            series_anchor,
            section_anchor: None,
            label_col_index: 0,
            header_row_offset: None,
        }
    }

    fn section_start(&self, sheet: &RawSheet) -> Result<usize, LocateError> {
        match &self.section_anchor {
            Some(section) => find_anchor_row(
                sheet,
                self.label_col_index,
                section,
                AnchorMatch::Contains,
                0,
            )
            .ok_or_else(|| LocateError::LocationNotFound {
                anchor: section.clone(),
                col: self.label_col_index,
                sheet: sheet.name().to_string(),
            }),
            None => Ok(0),
        }
    }

    fn locate(&self, sheet: &RawSheet) -> Result<SheetRegion, LocateError> {
        let search_from_row = self.section_start(sheet)?;
        AnchorLocator::new(LocatorOptions {
            anchor_text: Some(self.series_anchor.clone()),
            anchor_match: AnchorMatch::Exact,
            header_row_offset: self.header_row_offset,
            label_col_index: self.label_col_index,
            trailing_rows_to_drop: 0,
            header_cells: HeaderCells::Dates,
            search_from_row,
        })
        .locate(sheet)
    }
}

/// The reference series plus coercion bookkeeping
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub series: IndexSeries,
    pub coercion: CoercionReport,
    /// Dates skipped because their value was missing or not positive
    pub skipped: Vec<NaiveDate>,
}

/// Sort by date and drop repeated dates, keeping the first occurrence
fn sorted_unique<T>(mut points: Vec<(NaiveDate, T)>) -> Vec<(NaiveDate, T)> {
    points.sort_by_key(|(date, _)| *date);
    points.dedup_by_key(|(date, _)| *date);
    points
}

fn dated_columns(sheet: &RawSheet, region: &SheetRegion) -> Vec<(NaiveDate, usize)> {
    sorted_unique(
        region
            .header_dates(sheet)
            .into_iter()
            .filter_map(|(col, date)| date.map(|d| (d, col)))
            .collect(),
    )
}

#[instrument(skip(sheet, options), fields(sheet = %sheet.name(), anchor = %options.series_anchor))]
pub fn load_index_series(
    sheet: &RawSheet,
    options: &IndexSheetOptions,
) -> Result<LoadedIndex, IndexLoadError> {
    let region = options.locate(sheet)?;
    let row = region
        .anchor_row
        .ok_or_else(|| LocateError::LocationNotFound {
            anchor: options.series_anchor.clone(),
            col: options.label_col_index,
            sheet: sheet.name().to_string(),
        })?;

    let mut coercion = CoercionReport::default();
    let mut skipped = Vec::new();
    let mut points = Vec::new();

    // Dedupe on the raw header first so a repeated date keeps its first column
    for (date, col) in dated_columns(sheet, &region) {
        let value = coercion.coerce(sheet.get(row, col));
        if value.is_finite() && value > 0.0 {
            points.push((date, value));
        } else {
            skipped.push(date);
        }
    }

    coercion.log(sheet.name());
    if !skipped.is_empty() {
        warn!(
            "Skipped {} dates without a positive {} value",
            skipped.len(),
            options.series_anchor
        );
    }
    if points.is_empty() {
        return Err(IndexLoadError::NoValues {
            anchor: options.series_anchor.clone(),
        });
    }

    let (dates, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
    let series = IndexSeries::new(options.series_name.clone(), dates, values)?;
    info!(
        "Loaded index {} with {} points ({:?} to {:?})",
        series.name,
        series.len(),
        series.first_date(),
        series.last_date()
    );

    Ok(LoadedIndex {
        series,
        coercion,
        skipped,
    })
}

/// Load every category row of the block that starts at the series anchor,
/// up to the first blank label. Column names are cleaned with
/// [`LabelRules::category_names`] and prefixed with [`CATEGORY_PREFIX`].
#[instrument(skip(sheet, options), fields(sheet = %sheet.name()))]
pub fn load_index_table(
    sheet: &RawSheet,
    options: &IndexSheetOptions,
) -> Result<NormalizedTable, IndexLoadError> {
    let region = options.locate(sheet)?;
    let first_row = region.anchor_row.unwrap_or(region.header_row + 1);
    let columns_by_date = dated_columns(sheet, &region);
    let rules = LabelRules::category_names();

    let mut coercion = CoercionReport::default();
    let mut columns: Vec<Column> = Vec::new();

    for row in first_row..sheet.height() {
        let Some(label) = sheet.text(row, region.label_col) else {
            debug!("Category block ends at row {}", row);
            break;
        };
        let name = format!("{CATEGORY_PREFIX}{}", rules.apply(&label));
        let values = columns_by_date
            .iter()
            .map(|&(_, col)| coercion.coerce(sheet.get(row, col)))
            .collect();

        match columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => columns.push(Column::new(name, values)),
        }
    }

    coercion.log(sheet.name());

    let dates = columns_by_date.into_iter().map(|(date, _)| date).collect();
    let table = TimeSeriesTable::new(dates, columns)?;
    info!(
        "Loaded {} index categories x {} months",
        table.width(),
        table.len()
    );

    Ok(NormalizedTable {
        table,
        coercion,
        dropped_notes: Vec::new(),
    })
}
