//! Fetch → parse → normalize → rebase orchestration for every configured
//! source. Parsing entry points take bytes so they can run without network.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::basket::{parse_basket_csv, BasketError};
use crate::config::{SalaryKind, SourceConfig};
use crate::fetch_error::FetchError;
use crate::importers::SourceDownloader;
use crate::index_loader::{load_index_series, load_index_table, IndexLoadError};
use crate::locator::{LocateError, SheetLocator};
use crate::normalizer::{normalize_quarterly, NormalizeError, NormalizedTable};
use crate::rebase::{real, RebaseError};
use crate::sheet::{RawSheet, SheetError, SheetSelector};
use crate::timeseries::{IndexSeries, TableError, TimeSeriesTable};

/// Salary tables that are rebased against the price index
pub const REAL_KINDS: [SalaryKind; 3] = [SalaryKind::Net, SalaryKind::Gross, SalaryKind::Basic];

/// Weighted national aggregate published alongside the provinces
pub const WEIGHTED_AVERAGE_COLUMN: &str = "Promedio Ponderado (MG Total)";

pub fn analytics_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 12, 1).unwrap_or_default()
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to fetch {name}: {error}")]
    Fetch {
        name: String,
        #[source]
        error: FetchError,
    },

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Index(#[from] IndexLoadError),

    #[error(transparent)]
    Basket(#[from] BasketError),

    #[error(transparent)]
    Rebase(#[from] RebaseError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("No salary data on or after {start}")]
    EmptyPanel { start: NaiveDate },

    #[error("Column {column:?} not found in {table}")]
    MissingColumn { column: String, table: String },
}

/// National price index: the reference series plus every category row
#[derive(Debug, Clone, Serialize)]
pub struct PriceIndex {
    pub series: IndexSeries,
    pub categories: TimeSeriesTable,
}

pub fn parse_salary_sheet(
    bytes: &[u8],
    config: &SourceConfig,
) -> Result<NormalizedTable, PipelineError> {
    let sheet = RawSheet::from_bytes(bytes, &SheetSelector::First)?;
    let region = config.salary_locator().locate(&sheet)?;
    Ok(normalize_quarterly(&sheet, &region, &config.quarterly_options())?)
}

pub fn parse_price_index(bytes: &[u8], config: &SourceConfig) -> Result<PriceIndex, PipelineError> {
    let sheet = RawSheet::from_bytes(bytes, &config.ipc_sheet_selector())?;
    let options = config.ipc_sheet_options();
    let loaded = load_index_series(&sheet, &options)?;
    let categories = load_index_table(&sheet, &options)?;
    Ok(PriceIndex {
        series: loaded.series,
        categories: categories.table,
    })
}

pub fn parse_basket(bytes: &[u8]) -> Result<TimeSeriesTable, PipelineError> {
    Ok(parse_basket_csv(bytes)?.table)
}

/// Real salary panel fed to the clustering/anomaly layer: provinces only,
/// from `start`, rebased at the last nominal date
pub fn analytics_panel(
    nominal: &TimeSeriesTable,
    index: &IndexSeries,
    start: NaiveDate,
    exclude: &[&str],
) -> Result<TimeSeriesTable, PipelineError> {
    let panel = exclude
        .iter()
        .fold(nominal.slice_from(start), |table, column| {
            table.without_column(column)
        });
    let base_date = panel
        .dates()
        .last()
        .copied()
        .ok_or(PipelineError::EmptyPanel { start })?;
    Ok(real(&panel, index, Some(base_date))?)
}

/// Everything the dashboard layer reads
#[derive(Debug, Clone, Serialize)]
pub struct SalaryDataset {
    pub nominal: BTreeMap<SalaryKind, TimeSeriesTable>,
    pub real: BTreeMap<SalaryKind, TimeSeriesTable>,
    pub price_index: PriceIndex,
    pub basket: Option<TimeSeriesTable>,
    /// Date the real tables are expressed at
    pub base_date: NaiveDate,
}

impl SalaryDataset {
    pub fn nominal(&self, kind: SalaryKind) -> Option<&TimeSeriesTable> {
        self.nominal.get(&kind)
    }

    pub fn real(&self, kind: SalaryKind) -> Option<&TimeSeriesTable> {
        self.real.get(&kind)
    }

    pub fn analytics_panel(&self) -> Result<TimeSeriesTable, PipelineError> {
        let net = self
            .nominal(SalaryKind::Net)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: SalaryKind::Net.label().to_string(),
                table: "dataset".to_string(),
            })?;
        analytics_panel(
            net,
            &self.price_index.series,
            analytics_start(),
            &[WEIGHTED_AVERAGE_COLUMN],
        )
    }
}

/// Downloads and parses sources described by a [`SourceConfig`]
pub struct SourcePipeline {
    config: SourceConfig,
    downloader: SourceDownloader,
}

impl SourcePipeline {
    pub fn new(config: SourceConfig) -> Result<Self, PipelineError> {
        let downloader =
            SourceDownloader::new(config.http_timeout()).map_err(|error| PipelineError::Fetch {
                name: "http client".to_string(),
                error,
            })?;
        Ok(Self { config, downloader })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch(&self, name: &str, url: &str) -> Result<Vec<u8>, PipelineError> {
        self.downloader
            .download(url)
            .await
            .map_err(|error| PipelineError::Fetch {
                name: name.to_string(),
                error,
            })
    }

    #[instrument(skip(self))]
    pub async fn load_salary_table(
        &self,
        kind: SalaryKind,
    ) -> Result<TimeSeriesTable, PipelineError> {
        let bytes = self.fetch(kind.label(), self.config.salary_url(kind)).await?;
        let normalized = parse_salary_sheet(&bytes, &self.config)?;
        Ok(normalized.table)
    }

    #[instrument(skip(self))]
    pub async fn load_price_index(&self) -> Result<PriceIndex, PipelineError> {
        let bytes = self.fetch("price index", &self.config.ipc_url).await?;
        parse_price_index(&bytes, &self.config)
    }

    #[instrument(skip(self))]
    pub async fn load_basket(&self) -> Result<TimeSeriesTable, PipelineError> {
        let bytes = self.fetch("basket", &self.config.basket_url).await?;
        parse_basket(&bytes)
    }

    async fn load_optional_salary(
        &self,
        kind: SalaryKind,
    ) -> Option<(SalaryKind, TimeSeriesTable)> {
        match self.load_salary_table(kind).await {
            Ok(table) => Some((kind, table)),
            Err(e) => {
                warn!("Skipping {}: {}", kind.label(), e);
                None
            }
        }
    }

    /// Load every source. Net, gross and basic salaries and the price index
    /// are required; the remaining tables are skipped with a warning when
    /// they fail.
    #[instrument(skip(self))]
    pub async fn load_dataset(&self) -> Result<SalaryDataset, PipelineError> {
        let required = futures::future::try_join_all(REAL_KINDS.iter().map(|&kind| async move {
            let table = self.load_salary_table(kind).await?;
            Ok::<_, PipelineError>((kind, table))
        }));
        let optional = futures::future::join_all(
            [SalaryKind::RemunerativeShare, SalaryKind::AdditionalSums]
                .into_iter()
                .map(|kind| self.load_optional_salary(kind)),
        );
        let basket = async {
            match self.load_basket().await {
                Ok(table) => Some(table),
                Err(e) => {
                    warn!("Skipping basket: {}", e);
                    None
                }
            }
        };

        let (required, price_index, optional, basket) = futures::future::try_join4(
            required,
            self.load_price_index(),
            async { Ok::<_, PipelineError>(optional.await) },
            async { Ok::<_, PipelineError>(basket.await) },
        )
        .await?;

        let base_date = price_index
            .series
            .last_date()
            .ok_or_else(|| RebaseError::EmptyIndex {
                index: price_index.series.name.clone(),
            })?;

        let mut real_tables = BTreeMap::new();
        for (kind, table) in &required {
            real_tables.insert(*kind, real(table, &price_index.series, Some(base_date))?);
        }

        let nominal: BTreeMap<SalaryKind, TimeSeriesTable> = required
            .into_iter()
            .chain(optional.into_iter().flatten())
            .collect();

        info!(
            "Loaded {} salary tables, price index through {}, basket {}",
            nominal.len(),
            base_date,
            if basket.is_some() { "present" } else { "missing" }
        );

        Ok(SalaryDataset {
            nominal,
            real: real_tables,
            price_index,
            basket,
            base_date,
        })
    }
}
