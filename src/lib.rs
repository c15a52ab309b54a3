pub mod basket;
pub mod config;
pub mod dates;
pub mod fetch_error;
pub mod importers;
pub mod index_loader;
pub mod labels;
pub mod locator;
pub mod normalizer;
pub mod numeric;
pub mod pipeline;
pub mod rebase;
pub mod sheet;
pub mod timeseries;
pub mod variation;
