use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::index_loader::{IndexSheetOptions, CATEGORY_PREFIX};
use crate::labels::LabelRules;
use crate::locator::{AnchorLocator, HeaderCells, LocatorOptions};
use crate::normalizer::QuarterlyTableOptions;
use crate::sheet::SheetSelector;

const SALARY_BASE_URL: &str = "https://www.argentina.gob.ar/sites/default/files/2022/07/";
pub const DEFAULT_IPC_BASE_URL: &str = "https://www.indec.gob.ar/ftp/cuadros/economia/sh_ipc_";
pub const DEFAULT_BASKET_URL: &str = "https://infra.datos.gob.ar/catalog/sspm/dataset/150/distribution/150.1/download/valores-canasta-basica-alimentos-canasta-basica-total-mensual-2016.csv";
pub const DEFAULT_IPC_SHEET: &str = "Índices IPC Cobertura Nacional";
pub const DEFAULT_IPC_ANCHOR: &str = "Nivel general";

/// The quarterly salary tables published for the reference teaching post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryKind {
    Gross,
    Net,
    Basic,
    RemunerativeShare,
    AdditionalSums,
}

impl SalaryKind {
    pub const ALL: [SalaryKind; 5] = [
        SalaryKind::Gross,
        SalaryKind::Net,
        SalaryKind::Basic,
        SalaryKind::RemunerativeShare,
        SalaryKind::AdditionalSums,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SalaryKind::Gross => "gross salary",
            SalaryKind::Net => "net salary",
            SalaryKind::Basic => "basic salary",
            SalaryKind::RemunerativeShare => "remunerative share",
            SalaryKind::AdditionalSums => "additional sums",
        }
    }

    fn default_file(self) -> &'static str {
        match self {
            SalaryKind::Gross => "1._salario_bruto_mg10_25.xlsx",
            SalaryKind::Net => "2._salario_de_bolsillo_mg10_25.xlsx",
            SalaryKind::Basic => "3._sueldo_basico_25.xlsx",
            SalaryKind::RemunerativeShare => "4._porcentaje_de_componentes_remunerativos_sobre_el_salario_bruto_provincial_del_mg10_25.xlsx",
            SalaryKind::AdditionalSums => "5._sumas_adicionales_25.xlsx",
        }
    }

    fn env_key(self) -> &'static str {
        match self {
            SalaryKind::Gross => "GROSS_SALARY_URL",
            SalaryKind::Net => "NET_SALARY_URL",
            SalaryKind::Basic => "BASIC_SALARY_URL",
            SalaryKind::RemunerativeShare => "REMUNERATIVE_SHARE_URL",
            SalaryKind::AdditionalSums => "ADDITIONAL_SUMS_URL",
        }
    }
}

/// Monthly IPC workbook URL, e.g. `sh_ipc_03_24.xls` for March 2024
pub fn ipc_url_for(base_url: &str, year: i32, month: u32) -> String {
    format!("{base_url}{month:02}_{:02}.xls", year.rem_euclid(100))
}

/// Source endpoints and layout parameters, passed explicitly into each
/// pipeline stage
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub gross_salary_url: String,
    pub net_salary_url: String,
    pub basic_salary_url: String,
    pub remunerative_share_url: String,
    pub additional_sums_url: String,
    pub ipc_url: String,
    pub basket_url: String,
    pub http_timeout_secs: u64,
    pub salary_anchor_date: NaiveDate,
    pub salary_header_row: usize,
    pub salary_label_col: usize,
    pub salary_notes_rows: usize,
    pub ipc_sheet_name: String,
    pub ipc_series_anchor: String,
    pub ipc_section_anchor: Option<String>,
    pub ipc_label_col: usize,
    pub ipc_header_row: Option<usize>,
}

fn default_anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2003, 3, 1).unwrap_or_default()
}

impl Default for SourceConfig {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            gross_salary_url: format!("{SALARY_BASE_URL}{}", SalaryKind::Gross.default_file()),
            net_salary_url: format!("{SALARY_BASE_URL}{}", SalaryKind::Net.default_file()),
            basic_salary_url: format!("{SALARY_BASE_URL}{}", SalaryKind::Basic.default_file()),
            remunerative_share_url: format!(
                "{SALARY_BASE_URL}{}",
                SalaryKind::RemunerativeShare.default_file()
            ),
            additional_sums_url: format!(
                "{SALARY_BASE_URL}{}",
                SalaryKind::AdditionalSums.default_file()
            ),
            ipc_url: ipc_url_for(DEFAULT_IPC_BASE_URL, today.year(), today.month()),
            basket_url: DEFAULT_BASKET_URL.to_string(),
            http_timeout_secs: 10,
            salary_anchor_date: default_anchor_date(),
            salary_header_row: 6,
            salary_label_col: 1,
            salary_notes_rows: 5,
            ipc_sheet_name: DEFAULT_IPC_SHEET.to_string(),
            ipc_series_anchor: DEFAULT_IPC_ANCHOR.to_string(),
            ipc_section_anchor: None,
            ipc_label_col: 0,
            ipc_header_row: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl SourceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let today = Local::now().date_naive();

        let ipc_url = env::var("IPC_URL").unwrap_or_else(|_| {
            let base =
                env::var("IPC_BASE_URL").unwrap_or_else(|_| DEFAULT_IPC_BASE_URL.to_string());
            ipc_url_for(&base, today.year(), today.month())
        });

        Self {
            gross_salary_url: env::var(SalaryKind::Gross.env_key())
                .unwrap_or(defaults.gross_salary_url),
            net_salary_url: env::var(SalaryKind::Net.env_key()).unwrap_or(defaults.net_salary_url),
            basic_salary_url: env::var(SalaryKind::Basic.env_key())
                .unwrap_or(defaults.basic_salary_url),
            remunerative_share_url: env::var(SalaryKind::RemunerativeShare.env_key())
                .unwrap_or(defaults.remunerative_share_url),
            additional_sums_url: env::var(SalaryKind::AdditionalSums.env_key())
                .unwrap_or(defaults.additional_sums_url),
            ipc_url,
            basket_url: env::var("BASKET_URL").unwrap_or(defaults.basket_url),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            salary_anchor_date: env_parse("SALARY_ANCHOR_DATE", defaults.salary_anchor_date),
            salary_header_row: env_parse("SALARY_HEADER_ROW", defaults.salary_header_row),
            salary_label_col: env_parse("SALARY_LABEL_COL", defaults.salary_label_col),
            salary_notes_rows: env_parse("SALARY_NOTES_ROWS", defaults.salary_notes_rows),
            ipc_sheet_name: env::var("IPC_SHEET_NAME").unwrap_or(defaults.ipc_sheet_name),
            ipc_series_anchor: env::var("IPC_SERIES_ANCHOR").unwrap_or(defaults.ipc_series_anchor),
            ipc_section_anchor: env::var("IPC_SECTION_ANCHOR").ok(),
            ipc_label_col: env_parse("IPC_LABEL_COL", defaults.ipc_label_col),
            ipc_header_row: env::var("IPC_HEADER_ROW")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
        }
    }

    pub fn salary_url(&self, kind: SalaryKind) -> &str {
        match kind {
            SalaryKind::Gross => &self.gross_salary_url,
            SalaryKind::Net => &self.net_salary_url,
            SalaryKind::Basic => &self.basic_salary_url,
            SalaryKind::RemunerativeShare => &self.remunerative_share_url,
            SalaryKind::AdditionalSums => &self.additional_sums_url,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Locator for the quarterly salary tables: fixed header row, header
    /// extent taken from populated cells
    pub fn salary_locator(&self) -> AnchorLocator {
        AnchorLocator::new(LocatorOptions {
            header_row_offset: Some(self.salary_header_row),
            label_col_index: self.salary_label_col,
            trailing_rows_to_drop: self.salary_notes_rows,
            header_cells: HeaderCells::Populated,
            ..Default::default()
        })
    }

    pub fn quarterly_options(&self) -> QuarterlyTableOptions {
        QuarterlyTableOptions::new(self.salary_anchor_date)
    }

    pub fn ipc_sheet_selector(&self) -> SheetSelector {
        SheetSelector::Named(self.ipc_sheet_name.clone())
    }

    pub fn ipc_sheet_options(&self) -> IndexSheetOptions {
        let mut options = IndexSheetOptions::new(self.ipc_series_anchor.clone());
        options.series_name = format!(
            "{CATEGORY_PREFIX}{}",
            LabelRules::category_names().apply(&self.ipc_series_anchor)
        );
        options.section_anchor = self.ipc_section_anchor.clone();
        options.label_col_index = self.ipc_label_col;
        options.header_row_offset = self.ipc_header_row;
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc_url_for() {
        assert_eq!(
            ipc_url_for(DEFAULT_IPC_BASE_URL, 2024, 3),
            "https://www.indec.gob.ar/ftp/cuadros/economia/sh_ipc_03_24.xls"
        );
        assert!(ipc_url_for("x/sh_ipc_", 2030, 11).ends_with("sh_ipc_11_30.xls"));
    }

    #[test]
    fn test_default_ipc_url_uses_current_month() {
        let today = Local::now().date_naive();
        let expected = format!("sh_ipc_{:02}_{:02}.xls", today.month(), today.year() % 100);
        assert!(SourceConfig::default().ipc_url.ends_with(&expected));
    }

    #[test]
    fn test_ipc_series_name() {
        let options = SourceConfig::default().ipc_sheet_options();
        assert_eq!(options.series_name, "infl_Nivel_general");
        assert_eq!(options.series_anchor, "Nivel general");
    }

    #[test]
    fn test_salary_url_lookup() {
        let config = SourceConfig::default();
        for kind in SalaryKind::ALL {
            assert!(config.salary_url(kind).ends_with(".xlsx"));
        }
        assert!(config.salary_url(SalaryKind::Net).contains("salario_de_bolsillo"));
    }
}
