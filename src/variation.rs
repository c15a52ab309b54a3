//! Variation Engine: quarterly, inter-annual and annual-accumulated percent
//! changes for one series, with sampling frequency inferred from the data.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::dates::month_gap;
use crate::timeseries::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Quarterly,
}

impl Frequency {
    /// Classify from the gap between the last two dates only; the series is
    /// assumed to be uniformly sampled.
    pub fn detect(dates: &[NaiveDate]) -> Option<Self> {
        match dates {
            [.., previous, last] => Some(if month_gap(*previous, *last) >= 3 {
                Frequency::Quarterly
            } else {
                Frequency::Monthly
            }),
            _ => None,
        }
    }

    /// Periods spanning three months
    pub fn quarter_periods(self) -> usize {
        match self {
            Frequency::Quarterly => 1,
            Frequency::Monthly => 3,
        }
    }

    /// Periods spanning twelve months
    pub fn year_periods(self) -> usize {
        match self {
            Frequency::Quarterly => 4,
            Frequency::Monthly => 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationRow {
    pub date: NaiveDate,
    pub quarterly_pct: f64,
    pub annual_accumulated_pct: f64,
    pub interannual_pct: f64,
}

/// Variations aligned on the input series' dates; entries without enough
/// history are NaN
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationResult {
    pub name: String,
    pub frequency: Option<Frequency>,
    pub dates: Vec<NaiveDate>,
    pub quarterly_pct: Vec<f64>,
    pub annual_accumulated_pct: Vec<f64>,
    pub interannual_pct: Vec<f64>,
}

impl VariationResult {
    fn all_nan(series: &Series) -> Self {
        let n = series.len();
        Self {
            name: series.name.clone(),
            frequency: None,
            dates: series.dates().to_vec(),
            quarterly_pct: vec![f64::NAN; n],
            annual_accumulated_pct: vec![f64::NAN; n],
            interannual_pct: vec![f64::NAN; n],
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn at(&self, date: NaiveDate) -> Option<VariationRow> {
        let i = self.dates.binary_search(&date).ok()?;
        Some(self.row(i))
    }

    pub fn latest(&self) -> Option<VariationRow> {
        self.len().checked_sub(1).map(|i| self.row(i))
    }

    fn row(&self, i: usize) -> VariationRow {
        VariationRow {
            date: self.dates[i],
            quarterly_pct: self.quarterly_pct[i],
            annual_accumulated_pct: self.annual_accumulated_pct[i],
            interannual_pct: self.interannual_pct[i],
        }
    }
}

pub fn variations(series: &Series) -> VariationResult {
    let Some(frequency) = Frequency::detect(series.dates()) else {
        return VariationResult::all_nan(series);
    };
    debug!("Series {} detected as {:?}", series.name, frequency);

    let values = series.values();
    VariationResult {
        name: series.name.clone(),
        frequency: Some(frequency),
        dates: series.dates().to_vec(),
        quarterly_pct: pct_change(values, frequency.quarter_periods()),
        annual_accumulated_pct: annual_accumulated(series.dates(), values),
        interannual_pct: pct_change(values, frequency.year_periods()),
    }
}

fn pct_of(current: f64, base: f64) -> f64 {
    if base == 0.0 {
        f64::NAN
    } else {
        (current / base - 1.0) * 100.0
    }
}

/// Percent change against the value `periods` entries earlier
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, current)| match i.checked_sub(periods) {
            Some(j) => pct_of(*current, values[j]),
            None => f64::NAN,
        })
        .collect()
}

/// Percent change since the calendar-year anchor of each date.
///
/// Anchor, in order: the value on December 1 of the previous year; the latest
/// value dated before the current year; the first value of the series.
pub fn annual_accumulated(dates: &[NaiveDate], values: &[f64]) -> Vec<f64> {
    dates
        .iter()
        .zip(values)
        .map(|(date, current)| {
            let anchor = NaiveDate::from_ymd_opt(date.year() - 1, 12, 1)
                .and_then(|dec| dates.binary_search(&dec).ok())
                .or_else(|| {
                    let before_year = dates.partition_point(|d| d.year() < date.year());
                    before_year.checked_sub(1)
                })
                .unwrap_or(0);
            pct_of(*current, values[anchor])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_detect_frequency() {
        assert_eq!(
            Frequency::detect(&[ymd(2023, 9, 1), ymd(2023, 12, 1)]),
            Some(Frequency::Quarterly)
        );
        assert_eq!(
            Frequency::detect(&[ymd(2023, 11, 1), ymd(2023, 12, 1)]),
            Some(Frequency::Monthly)
        );
        assert_eq!(Frequency::detect(&[ymd(2023, 11, 1)]), None);
    }

    #[test]
    fn test_pct_change() {
        let changes = pct_change(&[100.0, 110.0, 0.0, 5.0], 1);
        assert!(changes[0].is_nan());
        assert!((changes[1] - 10.0).abs() < 1e-9);
        assert!((changes[2] + 100.0).abs() < 1e-9);
        assert!(changes[3].is_nan());
    }

    #[test]
    fn test_annual_accumulated_fallbacks() {
        // No December: falls back to the last value before the year
        let dates = [ymd(2022, 9, 1), ymd(2023, 3, 1), ymd(2023, 6, 1)];
        let acc = annual_accumulated(&dates, &[100.0, 110.0, 120.0]);
        assert!((acc[0] - 0.0).abs() < 1e-9);
        assert!((acc[1] - 10.0).abs() < 1e-9);
        assert!((acc[2] - 20.0).abs() < 1e-9);

        // First year of data: anchored at the first value
        let dates = [ymd(2023, 3, 1), ymd(2023, 6, 1)];
        let acc = annual_accumulated(&dates, &[100.0, 105.0]);
        assert!((acc[1] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_all_nan() {
        let series = Series::new("x", vec![ymd(2023, 3, 1)], vec![100.0]).unwrap();
        let result = variations(&series);
        assert_eq!(result.len(), 1);
        assert_eq!(result.frequency, None);
        assert!(result.quarterly_pct[0].is_nan());
        assert!(result.annual_accumulated_pct[0].is_nan());
        assert!(result.interannual_pct[0].is_nan());

        let empty = variations(&Series::new("x", vec![], vec![]).unwrap());
        assert!(empty.is_empty());
        assert!(empty.latest().is_none());
    }
}
