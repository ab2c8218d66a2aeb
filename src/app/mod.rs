//! Entry points tying config, catalog, pipelines and the engine together.

pub mod pipelines;

use crate::adapters::{HttpFetcher, LocalStorage};
use crate::config::ScrapeConfig;
use crate::core::engine::{RunReport, ScrapeEngine};
use crate::domain::model::{CodeRevision, CodeSet};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use pipelines::{CrawlPipeline, OutputOptions, RevisionPipeline};

/// Download `revision` with the default configuration and write it to
/// `output_path`.
pub async fn run(revision: CodeRevision, output_path: &str) -> Result<CodeSet> {
    let report = run_with_config(&ScrapeConfig::default(), &revision, output_path).await?;
    Ok(report.code_set)
}

/// Download `revision` as described by `config`. The revision is resolved
/// against the catalog before anything touches the network, so an unknown
/// revision fails without a request.
pub async fn run_with_config(
    config: &ScrapeConfig,
    revision: &CodeRevision,
    output_path: &str,
) -> Result<RunReport> {
    config.validate()?;
    crate::utils::validation::validate_path("output", output_path)?;

    let target = config.catalog().resolve(&config.source.base_url, revision)?;
    tracing::debug!("Resolved {} to {} ({} layout)", revision, target.url, target.layout);

    let fetcher = HttpFetcher::new(config.timeout(), &config.source.user_agent)?;
    let storage = LocalStorage::default();
    let output = OutputOptions {
        path: output_path.to_string(),
        format: config.output.format,
        header: config.output.header,
    };
    let monitor = config.monitoring.enabled;

    if config.crawl.enabled {
        let pipeline = CrawlPipeline::new(storage, fetcher, target, config.crawl.depth, output);
        ScrapeEngine::new_with_monitoring(pipeline, monitor).run().await
    } else {
        let pipeline = RevisionPipeline::new(storage, fetcher, target, output);
        ScrapeEngine::new_with_monitoring(pipeline, monitor).run().await
    }
}
