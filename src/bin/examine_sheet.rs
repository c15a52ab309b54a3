use calamine::{open_workbook_auto_from_rs, Reader};
use clap::Parser;
use std::io::Cursor;
use std::time::Duration;

use salary_tracker::importers::SourceDownloader;
use salary_tracker::sheet::{detect_format, PayloadFormat, RawSheet, SheetSelector};

#[derive(Parser)]
#[command(name = "examine-sheet")]
#[command(about = "Print the first rows of a spreadsheet", long_about = None)]
struct Cli {
    /// Local path or http(s) URL of an xlsx/xls/ods/csv file
    source: String,

    /// Sheet to examine (defaults to the first one)
    #[arg(long)]
    sheet: Option<String>,

    /// Number of rows to print
    #[arg(long, default_value = "40")]
    rows: usize,

    /// Number of columns to print per row
    #[arg(long, default_value = "10")]
    cols: usize,
}

async fn read_source(source: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let downloader = SourceDownloader::new(Duration::from_secs(30))?;
        Ok(downloader.download(source).await?)
    } else {
        Ok(std::fs::read(source)?)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    println!("Opening: {}", cli.source);
    let bytes = read_source(&cli.source).await?;

    if detect_format(&bytes) == PayloadFormat::Workbook {
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.clone()))?;
        println!("\nSheet names:");
        for (i, name) in workbook.sheet_names().iter().enumerate() {
            println!("  {i}: {name}");
        }
    }

    let selector = match &cli.sheet {
        Some(name) => SheetSelector::Named(name.clone()),
        None => SheetSelector::First,
    };
    let sheet = RawSheet::from_bytes(&bytes, &selector)?;

    println!("\n\nExamining sheet: {}", sheet.name());
    println!("{}", "=".repeat(100));
    println!("Dimensions: {} rows x {} cols", sheet.height(), sheet.width());
    println!(
        "\nFirst {} rows (showing first {} columns, 0-based indexes):",
        cli.rows, cli.cols
    );
    println!("{}", "=".repeat(100));

    for row_idx in 0..sheet.height().min(cli.rows) {
        let row = sheet.row(row_idx);
        // Only print rows with data
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        print!("Row {row_idx:3}: ");
        for cell in row.iter().take(cli.cols) {
            match cell.as_text() {
                Some(text) => print!("[{text}] "),
                None => print!("[empty] "),
            }
        }
        println!();
    }

    Ok(())
}
