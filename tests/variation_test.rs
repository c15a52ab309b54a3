// Tests for the Variation Engine on end-to-end series

use chrono::NaiveDate;
use salary_tracker::dates::add_months;
use salary_tracker::timeseries::Series;
use salary_tracker::variation::{variations, Frequency};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_quarterly_series() {
    let series = Series::new(
        "Chaco",
        vec![
            ymd(2023, 3, 1),
            ymd(2023, 6, 1),
            ymd(2023, 9, 1),
            ymd(2023, 12, 1),
            ymd(2024, 3, 1),
        ],
        vec![100.0, 110.0, 121.0, 133.1, 146.41],
    )
    .unwrap();

    let result = variations(&series);

    assert_eq!(result.frequency, Some(Frequency::Quarterly));
    assert_eq!(result.len(), 5);
    assert!(result.quarterly_pct[0].is_nan());
    assert_close(result.at(ymd(2023, 6, 1)).unwrap().quarterly_pct, 10.0);
    assert_close(result.at(ymd(2024, 3, 1)).unwrap().interannual_pct, 46.41);
    for i in 0..4 {
        assert!(result.interannual_pct[i].is_nan());
    }
    // 2024 is anchored at December 2023
    assert_close(result.at(ymd(2024, 3, 1)).unwrap().annual_accumulated_pct, 10.0);
}

#[test]
fn test_monthly_series_uses_three_and_twelve_periods() {
    let start = ymd(2022, 1, 1);
    let dates: Vec<NaiveDate> = (0..14).map(|m| add_months(start, m).unwrap()).collect();
    let values: Vec<f64> = (0..14).map(|m| 100.0 + m as f64).collect();
    let series = Series::new("infl_Nivel_general", dates, values).unwrap();

    let result = variations(&series);

    assert_eq!(result.frequency, Some(Frequency::Monthly));
    assert!(result.quarterly_pct[2].is_nan());
    // April 2022 vs January 2022
    assert_close(result.quarterly_pct[3], 3.0);
    assert!(result.interannual_pct[11].is_nan());
    // January 2023 vs January 2022
    assert_close(result.interannual_pct[12], 12.0);
    // February 2023 vs December 2022 (111)
    assert_close(result.annual_accumulated_pct[13], (113.0 / 111.0 - 1.0) * 100.0);
}

#[test]
fn test_annual_accumulated_december_anchor() {
    let series = Series::new(
        "Chaco",
        vec![ymd(2022, 12, 1), ymd(2023, 3, 1), ymd(2023, 6, 1)],
        vec![100.0, 110.0, 121.0],
    )
    .unwrap();

    let result = variations(&series);

    assert_close(result.at(ymd(2023, 6, 1)).unwrap().annual_accumulated_pct, 21.0);
    assert_close(result.at(ymd(2023, 3, 1)).unwrap().annual_accumulated_pct, 10.0);
}

#[test]
fn test_zero_or_missing_anchor_is_nan() {
    let series = Series::new(
        "Salta",
        vec![ymd(2022, 12, 1), ymd(2023, 3, 1), ymd(2023, 6, 1)],
        vec![0.0, 110.0, f64::NAN],
    )
    .unwrap();

    let result = variations(&series);

    assert!(result.annual_accumulated_pct[1].is_nan());
    assert!(result.quarterly_pct[2].is_nan());
}

#[test]
fn test_frequency_decided_by_last_gap_only() {
    // Monthly history with a quarterly tail is treated as quarterly
    let series = Series::new(
        "x",
        vec![ymd(2023, 1, 1), ymd(2023, 2, 1), ymd(2023, 5, 1)],
        vec![100.0, 101.0, 110.0],
    )
    .unwrap();

    let result = variations(&series);

    assert_eq!(result.frequency, Some(Frequency::Quarterly));
    assert_close(result.quarterly_pct[2], (110.0 / 101.0 - 1.0) * 100.0);
}
