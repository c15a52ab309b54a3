//! Canonical date-indexed tables produced at the ingestion boundary and
//! consumed by the rebaser, the variation engine and downstream layers.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Dates must be strictly increasing: {next} follows {previous}")]
    UnorderedDates {
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("Column {column} has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Index {name} must be strictly positive, got {value} at {date}")]
    NonPositiveIndex {
        name: String,
        date: NaiveDate,
        value: f64,
    },
}

fn check_ascending(dates: &[NaiveDate]) -> Result<(), TableError> {
    match dates.windows(2).find(|w| w[0] >= w[1]) {
        Some(w) => Err(TableError::UnorderedDates {
            previous: w[0],
            next: w[1],
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Strictly ascending date axis shared by insertion-ordered named columns.
/// Missing values are NaN; rows are never dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, TableError> {
        check_ascending(&dates)?;

        let mut seen = HashSet::new();
        for column in &columns {
            if column.values.len() != dates.len() {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: dates.len(),
                    found: column.values.len(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self { dates, columns })
    }

    /// Same axis, new columns. Callers guarantee the column lengths.
    fn with_columns(&self, columns: Vec<Column>) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == self.dates.len()));
        Self {
            dates: self.dates.clone(),
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn value_at(&self, name: &str, date: NaiveDate) -> Option<f64> {
        let row = self.position(date)?;
        self.column(name).map(|values| values[row])
    }

    /// Most recent non-NaN value of a column
    pub fn latest(&self, name: &str) -> Option<(NaiveDate, f64)> {
        let values = self.column(name)?;
        self.dates
            .iter()
            .zip(values)
            .rev()
            .find(|(_, v)| !v.is_nan())
            .map(|(d, v)| (*d, *v))
    }

    /// Extract one column as a univariate series on this table's axis
    pub fn series(&self, name: &str) -> Option<Series> {
        self.column(name).map(|values| Series {
            name: name.to_string(),
            dates: self.dates.clone(),
            values: values.to_vec(),
        })
    }

    /// Rows dated on or after `start`
    pub fn slice_from(&self, start: NaiveDate) -> Self {
        let first = self.dates.partition_point(|d| *d < start);
        Self {
            dates: self.dates[first..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[first..].to_vec()))
                .collect(),
        }
    }

    pub fn without_column(&self, name: &str) -> Self {
        self.with_columns(
            self.columns
                .iter()
                .filter(|c| c.name != name)
                .cloned()
                .collect(),
        )
    }

    /// Multiply every value by `factor`
    pub fn scale(&self, factor: f64) -> Self {
        self.map_columns(|_, values| values.iter().map(|v| v * factor).collect())
    }

    /// Rebuild every column from its name and values; `f` must return one
    /// value per date.
    pub fn map_columns<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &[f64]) -> Vec<f64>,
    {
        self.with_columns(
            self.columns
                .iter()
                .map(|c| Column::new(c.name.clone(), f(&c.name, &c.values)))
                .collect(),
        )
    }
}

/// A single named series on its own ascending date axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl Series {
    pub fn new(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<Self, TableError> {
        let name = name.into();
        check_ascending(&dates)?;
        if dates.len() != values.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: dates.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            name,
            dates,
            values,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.dates.binary_search(&date).ok().map(|i| self.values[i])
    }
}

/// Strictly positive price or basket level series used as a rebasing
/// denominator. Its axis need not match any table's axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSeries {
    pub name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl IndexSeries {
    pub fn new(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<Self, TableError> {
        let series = Series::new(name, dates, values)?;
        if let Some((date, value)) = series
            .dates
            .iter()
            .zip(&series.values)
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(TableError::NonPositiveIndex {
                name: series.name,
                date: *date,
                value: *value,
            });
        }
        Ok(Self {
            name: series.name,
            dates: series.dates,
            values: series.values,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Exact-date lookup
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.dates.binary_search(&date).ok().map(|i| self.values[i])
    }

    /// Align onto another axis carrying the last known value forward.
    /// Dates before the first index date get NaN.
    pub fn forward_fill_onto(&self, axis: &[NaiveDate]) -> Vec<f64> {
        axis.iter()
            .map(|date| {
                let known = self.dates.partition_point(|d| d <= date);
                if known == 0 {
                    f64::NAN
                } else {
                    self.values[known - 1]
                }
            })
            .collect()
    }

    pub fn as_series(&self) -> Series {
        Series {
            name: self.name.clone(),
            dates: self.dates.clone(),
            values: self.values.clone(),
        }
    }

    pub fn slice_from(&self, start: NaiveDate) -> Self {
        let first = self.dates.partition_point(|d| *d < start);
        Self {
            name: self.name.clone(),
            dates: self.dates[first..].to_vec(),
            values: self.values[first..].to_vec(),
        }
    }
}
