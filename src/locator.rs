//! Sheet Locator: finds the header row, label column and data columns of a
//! table whose position drifts between spreadsheet releases.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::dates::parse_header_date;
use crate::sheet::{Cell, RawSheet};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("Anchor text {anchor:?} not found in column {col} of sheet {sheet}")]
    LocationNotFound {
        anchor: String,
        col: usize,
        sheet: String,
    },

    #[error("No header row found in sheet {sheet}")]
    HeaderNotFound { sheet: String },
}

/// How an anchor label is compared against label cells (both trimmed,
/// case-insensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorMatch {
    #[default]
    Contains,
    Exact,
}

/// What counts as a data-column header cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderCells {
    /// Cells that parse as dates in any supported format
    #[default]
    Dates,
    /// Any non-blank cell; for tables whose header text is too irregular to
    /// parse and whose dates are synthesized instead
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocatorOptions {
    pub anchor_text: Option<String>,
    pub anchor_match: AnchorMatch,
    /// Fixed header row; when `None` the header is searched for, upward from
    /// the anchor row if there is one, otherwise from the top
    pub header_row_offset: Option<usize>,
    pub label_col_index: usize,
    /// Trailing labeled rows that are notes, not data. Passed through to the
    /// normalizer.
    pub trailing_rows_to_drop: usize,
    pub header_cells: HeaderCells,
    /// First row considered when searching for the anchor
    pub search_from_row: usize,
}

/// Coordinates of a located data region (0-based, inclusive column bounds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRegion {
    pub header_row: usize,
    pub label_col: usize,
    pub first_data_col: usize,
    pub last_data_col: usize,
    pub anchor_row: Option<usize>,
    pub trailing_rows_to_drop: usize,
}

impl SheetRegion {
    pub fn data_columns(&self) -> std::ops::RangeInclusive<usize> {
        self.first_data_col..=self.last_data_col
    }

    pub fn data_column_count(&self) -> usize {
        self.last_data_col + 1 - self.first_data_col
    }

    /// Header dates of the data columns (`None` where a header cell does not
    /// parse, which only happens with [`HeaderCells::Populated`])
    pub fn header_dates(&self, sheet: &RawSheet) -> Vec<(usize, Option<NaiveDate>)> {
        self.data_columns()
            .map(|col| (col, parse_header_date(sheet.get(self.header_row, col))))
            .collect()
    }
}

/// Strategy for finding the data region of a sheet. New spreadsheet layouts
/// get a new implementation; normalization and computation stay untouched.
pub trait SheetLocator {
    fn locate(&self, sheet: &RawSheet) -> Result<SheetRegion, LocateError>;
}

/// Anchor-text and header-scan locator
#[derive(Debug, Clone, Default)]
pub struct AnchorLocator {
    options: LocatorOptions,
}

impl AnchorLocator {
    pub fn new(options: LocatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LocatorOptions {
        &self.options
    }

    fn is_header_cell(&self, cell: &Cell) -> bool {
        match self.options.header_cells {
            HeaderCells::Dates => parse_header_date(cell).is_some(),
            HeaderCells::Populated => !cell.is_empty(),
        }
    }

    fn header_run(&self, sheet: &RawSheet, row: usize) -> Option<(usize, usize)> {
        scan_header_run(sheet.row(row), self.options.label_col_index + 1, |cell| {
            self.is_header_cell(cell)
        })
    }
}

impl SheetLocator for AnchorLocator {
    #[instrument(skip(self, sheet), fields(sheet = %sheet.name()))]
    fn locate(&self, sheet: &RawSheet) -> Result<SheetRegion, LocateError> {
        let opts = &self.options;
        let label_col = opts.label_col_index;

        let anchor_row = match &opts.anchor_text {
            Some(anchor) => {
                let row = find_anchor_row(
                    sheet,
                    label_col,
                    anchor,
                    opts.anchor_match,
                    opts.search_from_row,
                )
                .ok_or_else(|| LocateError::LocationNotFound {
                    anchor: anchor.clone(),
                    col: label_col,
                    sheet: sheet.name().to_string(),
                })?;
                debug!("Anchor {:?} found at row {}", anchor, row);
                Some(row)
            }
            None => None,
        };

        let header_not_found = || LocateError::HeaderNotFound {
            sheet: sheet.name().to_string(),
        };

        let (header_row, (first_data_col, last_data_col)) = match opts.header_row_offset {
            Some(row) => (row, self.header_run(sheet, row).ok_or_else(header_not_found)?),
            None => {
                let candidates: Box<dyn Iterator<Item = usize>> = match anchor_row {
                    Some(anchor) => Box::new((0..anchor).rev()),
                    None => Box::new(0..sheet.height()),
                };
                candidates
                    .filter_map(|row| self.header_run(sheet, row).map(|run| (row, run)))
                    .next()
                    .ok_or_else(header_not_found)?
            }
        };

        debug!(
            "Header row {} with data columns {}..={}",
            header_row, first_data_col, last_data_col
        );

        Ok(SheetRegion {
            header_row,
            label_col,
            first_data_col,
            last_data_col,
            anchor_row,
            trailing_rows_to_drop: opts.trailing_rows_to_drop,
        })
    }
}

/// First row at or after `from_row` whose label cell matches `anchor`
pub fn find_anchor_row(
    sheet: &RawSheet,
    label_col: usize,
    anchor: &str,
    mode: AnchorMatch,
    from_row: usize,
) -> Option<usize> {
    let needle = anchor.trim().to_lowercase();
    (from_row..sheet.height()).find(|&row| {
        sheet
            .text(row, label_col)
            .map(|label| {
                let label = label.to_lowercase();
                match mode {
                    AnchorMatch::Contains => label.contains(&needle),
                    AnchorMatch::Exact => label == needle,
                }
            })
            .unwrap_or(false)
    })
}

/// Find the first run of header cells starting at or after `start_col`.
///
/// Leading non-header cells are skipped; once a run has started, the first
/// non-header cell ends it so trailing commentary columns stay out.
pub fn scan_header_run<F>(cells: &[Cell], start_col: usize, is_header: F) -> Option<(usize, usize)>
where
    F: Fn(&Cell) -> bool,
{
    let mut run: Option<(usize, usize)> = None;
    for (col, cell) in cells.iter().enumerate().skip(start_col) {
        match (run, is_header(cell)) {
            (None, true) => run = Some((col, col)),
            (Some((first, _)), true) => run = Some((first, col)),
            (Some(_), false) => break,
            (None, false) => {}
        }
    }
    run
}
