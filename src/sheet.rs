use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("Failed to read CSV payload: {0}")]
    Csv(#[from] csv::Error),
}

/// A single untyped spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form of the cell, `None` for blanks
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.to_string()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(chrono_dt) => Cell::Date(chrono_dt.date()),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => parse_iso_date(s)
                .map(Cell::Date)
                .unwrap_or_else(|| Cell::Text(s.clone())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Which worksheet of a workbook payload to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    First,
    Named(String),
}

/// Payload kinds recognised by their leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// xlsx / ods (zip container) or legacy xls (OLE compound file)
    Workbook,
    Csv,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

pub fn detect_format(bytes: &[u8]) -> PayloadFormat {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        PayloadFormat::Workbook
    } else {
        PayloadFormat::Csv
    }
}

/// Untyped 2D grid of cells with absolute row/column positions.
///
/// Nothing is assumed about where the header sits; locating the data region
/// is the job of [`crate::locator`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

static EMPTY: Cell = Cell::Empty;

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build a sheet from string rows, blank strings becoming empty cells.
    /// Handy for CSV exports and tests.
    pub fn from_text_rows<R, S>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| text_cell(s.as_ref())).collect())
            .collect();
        Self::new(name, rows)
    }

    /// Parse a downloaded payload, sniffing whether it is a workbook or CSV
    pub fn from_bytes(bytes: &[u8], selector: &SheetSelector) -> Result<Self, SheetError> {
        match detect_format(bytes) {
            PayloadFormat::Workbook => Self::from_workbook_bytes(bytes, selector),
            PayloadFormat::Csv => Self::from_csv_bytes(bytes, "csv"),
        }
    }

    pub fn from_workbook_bytes(bytes: &[u8], selector: &SheetSelector) -> Result<Self, SheetError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| SheetError::WorkbookOpen(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        debug!("Workbook has {} sheets: {:?}", sheet_names.len(), sheet_names);

        let name = match selector {
            SheetSelector::First => sheet_names
                .first()
                .cloned()
                .ok_or(SheetError::EmptyWorkbook)?,
            SheetSelector::Named(wanted) => sheet_names
                .iter()
                .find(|n| n.trim().eq_ignore_ascii_case(wanted.trim()))
                .cloned()
                .ok_or_else(|| SheetError::SheetNotFound(wanted.clone()))?,
        };

        let range = workbook
            .worksheet_range(&name)
            .map_err(|_| SheetError::SheetNotFound(name.clone()))?;

        let sheet = Self::from_range(name, &range);
        info!(
            "Loaded sheet '{}' ({} rows x {} cols)",
            sheet.name,
            sheet.height(),
            sheet.width()
        );
        Ok(sheet)
    }

    /// Convert a calamine range, padding leading empty rows/columns so that
    /// indexes stay absolute (row 0 is the first row of the worksheet).
    pub fn from_range(name: impl Into<String>, range: &Range<Data>) -> Self {
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }

        Self::new(name, rows)
    }

    pub fn from_csv_bytes(bytes: &[u8], name: impl Into<String>) -> Result<Self, SheetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| text_cell(&String::from_utf8_lossy(field)))
                    .collect(),
            );
        }

        let sheet = Self::new(name, rows);
        debug!(
            "Parsed CSV payload ({} rows x {} cols)",
            sheet.height(),
            sheet.width()
        );
        Ok(sheet)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell at `(row, col)`; out-of-range positions read as empty
    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.get(row, col).as_text()
    }
}

fn text_cell(s: &str) -> Cell {
    if s.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}
