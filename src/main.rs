use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use salary_tracker::config::{SalaryKind, SourceConfig};
use salary_tracker::pipeline::{SalaryDataset, SourcePipeline};
use salary_tracker::rebase::real;
use salary_tracker::variation::{variations, VariationRow};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Net,
    Gross,
    Basic,
}

impl From<KindArg> for SalaryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Net => SalaryKind::Net,
            KindArg::Gross => SalaryKind::Gross,
            KindArg::Basic => SalaryKind::Basic,
        }
    }
}

#[derive(Parser)]
#[command(name = "salary-tracker")]
#[command(about = "Compare provincial teacher salaries against inflation", long_about = None)]
struct Cli {
    /// Province column to report on
    #[arg(long, default_value = "Chaco")]
    province: String,

    /// Salary table to report on
    #[arg(long, value_enum, default_value = "net")]
    kind: KindArg,

    /// Rebase real values at this date (YYYY-MM-DD) instead of the latest index date
    #[arg(long)]
    base_date: Option<NaiveDate>,

    /// Override the monthly IPC workbook URL
    #[arg(long)]
    ipc_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the real salary panel used for clustering instead of a report
    #[arg(long)]
    panel: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ProvinceReport {
    province: String,
    kind: SalaryKind,
    base_date: NaiveDate,
    latest_nominal: Option<(NaiveDate, f64)>,
    latest_real: Option<(NaiveDate, f64)>,
    nominal_variation: Option<VariationRow>,
    real_variation: Option<VariationRow>,
    inflation_variation: Option<VariationRow>,
}

fn build_report(
    dataset: &SalaryDataset,
    province: &str,
    kind: SalaryKind,
    base_date: Option<NaiveDate>,
) -> Result<ProvinceReport, Box<dyn std::error::Error>> {
    let nominal = dataset
        .nominal(kind)
        .ok_or_else(|| format!("No {} table loaded", kind.label()))?;
    let base_date = base_date.unwrap_or(dataset.base_date);
    let real_table = real(nominal, &dataset.price_index.series, Some(base_date))?;

    let nominal_series = nominal
        .series(province)
        .ok_or_else(|| format!("Province {province:?} not found in {}", kind.label()))?;
    let real_series = real_table
        .series(province)
        .ok_or_else(|| format!("Province {province:?} not found in real {}", kind.label()))?;

    Ok(ProvinceReport {
        province: province.to_string(),
        kind,
        base_date,
        latest_nominal: nominal.latest(province),
        latest_real: real_table.latest(province),
        nominal_variation: variations(&nominal_series).latest(),
        real_variation: variations(&real_series).latest(),
        inflation_variation: variations(&dataset.price_index.series.as_series()).latest(),
    })
}

fn print_variation(label: &str, row: &Option<VariationRow>) {
    match row {
        Some(row) => println!(
            "  {label:<10} {}  quarterly {:>8.2}%  year-to-date {:>8.2}%  interannual {:>8.2}%",
            row.date, row.quarterly_pct, row.annual_accumulated_pct, row.interannual_pct
        ),
        None => println!("  {label:<10} no data"),
    }
}

fn print_report(report: &ProvinceReport) {
    println!(
        "{} {} (real values at {})",
        report.province,
        report.kind.label(),
        report.base_date
    );
    println!("{}", "=".repeat(80));
    if let Some((date, value)) = report.latest_nominal {
        println!("  Nominal    {date}  {value:>14.2}");
    }
    if let Some((date, value)) = report.latest_real {
        println!("  Real       {date}  {value:>14.2}");
    }
    println!();
    print_variation("Nominal", &report.nominal_variation);
    print_variation("Real", &report.real_variation);
    print_variation("Inflation", &report.inflation_variation);
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,salary_tracker=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = SourceConfig::from_env();
    if let Some(url) = cli.ipc_url {
        config.ipc_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        config.http_timeout_secs = secs;
    }
    info!("Loading sources (IPC from {})", config.ipc_url);

    let pipeline = SourcePipeline::new(config)?;
    let dataset = pipeline.load_dataset().await?;

    if cli.panel {
        let panel = dataset.analytics_panel()?;
        info!(
            "Analytics panel: {} provinces x {} quarters",
            panel.width(),
            panel.len()
        );
        println!("{}", serde_json::to_string_pretty(&panel)?);
        return Ok(());
    }

    let report = build_report(&dataset, &cli.province, cli.kind.into(), cli.base_date)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}
