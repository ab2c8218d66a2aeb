use crate::core::Pipeline;
use crate::domain::model::CodeSet;
use crate::utils::error::Result;
use crate::utils::monitor::StageMonitor;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub code_set: CodeSet,
    pub output_path: String,
}

/// Runs a pipeline's stages strictly in order: fetch, parse, emit.
pub struct ScrapeEngine<P: Pipeline> {
    pipeline: P,
    monitor_enabled: bool,
}

impl<P: Pipeline> ScrapeEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor_enabled,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let mut monitor = StageMonitor::new(self.monitor_enabled);
        tracing::info!("Starting scrape");

        let raw = self.pipeline.fetch().await?;
        let fetched = monitor.finish_stage("fetch");
        tracing::info!("Fetched source in {:?}", fetched.stage_elapsed);

        let code_set = self.pipeline.parse(raw).await?;
        monitor.finish_stage("parse");
        tracing::info!(
            "Parsed {} codes for {}",
            code_set.len(),
            code_set.revision()
        );

        let output_path = self.pipeline.emit(&code_set).await?;
        monitor.finish_stage("emit");
        tracing::info!("Output saved to: {}", output_path);

        monitor.log_final_stats();
        Ok(RunReport {
            code_set,
            output_path,
        })
    }
}
