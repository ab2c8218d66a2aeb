pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod parser;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpFetcher, LocalStorage};
pub use app::{run, run_with_config};
pub use config::{RevisionCatalog, ScrapeConfig};
pub use core::{
    emit::OutputFormat,
    engine::{RunReport, ScrapeEngine},
};
pub use domain::model::{CodeRecord, CodeRevision, CodeSet, CrawlDepth};
pub use parser::Layout;
pub use utils::error::{Result, ScrapeError, Stage};
