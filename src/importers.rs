//! Source downloads for the salary, price index and basket spreadsheets

pub mod downloader;

pub use downloader::SourceDownloader;
