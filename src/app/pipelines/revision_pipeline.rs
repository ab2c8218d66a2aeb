use super::OutputOptions;
use crate::config::catalog::ResolvedRevision;
use crate::core::{CodeSet, Fetcher, Pipeline, Storage};
use crate::parser::parse_classification;
use crate::utils::error::Result;

/// Single-page pipeline: GET the revision's listing page, parse its code
/// table or tree, write one record per line.
pub struct RevisionPipeline<S: Storage, F: Fetcher> {
    storage: S,
    fetcher: F,
    target: ResolvedRevision,
    output: OutputOptions,
}

impl<S: Storage, F: Fetcher> RevisionPipeline<S, F> {
    pub fn new(storage: S, fetcher: F, target: ResolvedRevision, output: OutputOptions) -> Self {
        Self {
            storage,
            fetcher,
            target,
            output,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, F: Fetcher> Pipeline for RevisionPipeline<S, F> {
    type Raw = String;

    async fn fetch(&self) -> Result<String> {
        tracing::info!("Fetching {} from {}", self.target.revision, self.target.url);
        let body = self.fetcher.get_text(self.target.url.as_str()).await?;
        tracing::debug!("Received {} bytes", body.len());
        Ok(body)
    }

    async fn parse(&self, raw: String) -> Result<CodeSet> {
        parse_classification(
            &raw,
            self.target.layout,
            &self.target.revision,
            self.target.url.as_str(),
        )
    }

    async fn emit(&self, code_set: &CodeSet) -> Result<String> {
        self.output.write(&self.storage, code_set).await
    }
}
