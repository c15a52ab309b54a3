// Tests for locating and normalizing quarterly salary tables

use chrono::NaiveDate;
use salary_tracker::locator::{
    AnchorLocator, HeaderCells, LocateError, LocatorOptions, SheetLocator,
};
use salary_tracker::normalizer::{normalize_quarterly, quarterly_axis, QuarterlyTableOptions};
use salary_tracker::sheet::RawSheet;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn quarterly_locator(notes: usize) -> AnchorLocator {
    AnchorLocator::new(LocatorOptions {
        header_row_offset: Some(2),
        label_col_index: 1,
        trailing_rows_to_drop: notes,
        header_cells: HeaderCells::Populated,
        ..Default::default()
    })
}

fn salary_sheet(labels: &[&str], quarters: usize) -> RawSheet {
    let mut rows: Vec<Vec<String>> = vec![vec![String::new(); quarters + 2]; 2];
    rows[0][1] = "Salario docente".to_string();

    let mut header = vec![String::new(), "Jurisdicción".to_string()];
    header.extend((0..quarters).map(|q| format!("T{q}")));
    rows.push(header);

    for (i, label) in labels.iter().enumerate() {
        let mut row = vec![String::new(), label.to_string()];
        row.extend((0..quarters).map(|q| format!("{}", 1000 * (i + 1) + q)));
        rows.push(row);
    }
    RawSheet::from_text_rows("salarios", rows)
}

#[test]
fn test_footnote_markers_stripped_from_every_label() {
    let labels = [
        "Buenos Aires (1)",
        "Catamarca(2)",
        "Chaco (3)",
        "Córdoba(9)",
        "Entre Ríos",
        "Nota (1)",
        "Fuente: CGECSE",
    ];
    let sheet = salary_sheet(&labels, 4);
    let region = quarterly_locator(2).locate(&sheet).unwrap();

    let normalized =
        normalize_quarterly(&sheet, &region, &QuarterlyTableOptions::new(ymd(2003, 3, 1)))
            .unwrap();
    let names: Vec<&str> = normalized.table.column_names().collect();

    assert_eq!(
        names,
        vec!["Buenos Aires", "Catamarca", "Chaco", "Córdoba", "Entre Ríos"]
    );
    assert!(names.iter().all(|n| !n.contains('(') && n.trim() == *n));
    assert_eq!(names.len(), labels.len() - 2);
    assert_eq!(normalized.dropped_notes, vec!["Nota (1)", "Fuente: CGECSE"]);
}

#[test]
fn test_axis_synthesized_from_anchor() {
    let axis = quarterly_axis(ymd(2003, 3, 1), 3).unwrap();
    assert_eq!(
        axis,
        vec![ymd(2003, 3, 1), ymd(2003, 6, 1), ymd(2003, 9, 1), ymd(2003, 12, 1)]
    );

    let sheet = salary_sheet(&["Chaco", "Salta"], 3);
    let region = quarterly_locator(0).locate(&sheet).unwrap();
    let table = normalize_quarterly(&sheet, &region, &QuarterlyTableOptions::new(ymd(2003, 3, 1)))
        .unwrap()
        .table;

    assert_eq!(table.dates(), &axis[1..]);
    assert_eq!(table.value_at("Chaco", ymd(2003, 6, 1)), Some(1000.0));
    assert_eq!(table.value_at("Salta", ymd(2003, 12, 1)), Some(2002.0));
}

#[test]
fn test_trailing_commentary_column_excluded() {
    let sheet = RawSheet::from_text_rows(
        "salarios",
        vec![
            vec!["", "", "", "", "", ""],
            vec!["", "", "", "", "", ""],
            vec!["", "Jurisdicción", "I-03", "II-03", "", "Observaciones"],
            vec!["", "Chaco", "100", "110", "", "provisorio"],
            vec!["", "Salta", "90", "95", "", ""],
        ],
    );

    let region = quarterly_locator(0).locate(&sheet).unwrap();
    assert_eq!((region.first_data_col, region.last_data_col), (2, 3));

    let normalized =
        normalize_quarterly(&sheet, &region, &QuarterlyTableOptions::new(ymd(2003, 3, 1)))
            .unwrap();
    assert_eq!(normalized.table.len(), 2);
    assert!(normalized.coercion.is_clean());
}

#[test]
fn test_locale_values_coerced_and_failures_counted() {
    let sheet = RawSheet::from_text_rows(
        "salarios",
        vec![
            vec!["", "", "", ""],
            vec!["", "", "", ""],
            vec!["", "Jurisdicción", "I-03", "II-03"],
            vec!["", "Chaco", "$ 1.234,56", "s/d"],
            vec!["", "Salta", "1,234.50", ""],
        ],
    );
    let region = quarterly_locator(0).locate(&sheet).unwrap();

    let normalized =
        normalize_quarterly(&sheet, &region, &QuarterlyTableOptions::new(ymd(2003, 3, 1)))
            .unwrap();
    let table = &normalized.table;

    assert_eq!(table.value_at("Chaco", ymd(2003, 6, 1)), Some(1234.56));
    assert!(table.value_at("Chaco", ymd(2003, 9, 1)).unwrap().is_nan());
    assert_eq!(table.value_at("Salta", ymd(2003, 6, 1)), Some(1234.5));
    assert!(table.value_at("Salta", ymd(2003, 9, 1)).unwrap().is_nan());
    assert_eq!(normalized.coercion.failed, 1);
}

#[test]
fn test_missing_anchor_fails_fast() {
    let sheet = salary_sheet(&["Chaco"], 2);
    let locator = AnchorLocator::new(LocatorOptions {
        anchor_text: Some("Promedio".to_string()),
        label_col_index: 1,
        ..Default::default()
    });

    assert!(matches!(
        locator.locate(&sheet),
        Err(LocateError::LocationNotFound { .. })
    ));
}
