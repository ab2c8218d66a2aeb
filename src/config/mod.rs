pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use catalog::{ResolvedRevision, RevisionCatalog, RevisionEntry};
#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::ScrapeConfig;
