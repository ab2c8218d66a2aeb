pub mod crawl_pipeline;
pub mod revision_pipeline;

pub use crawl_pipeline::{CrawlNode, CrawlPipeline};
pub use revision_pipeline::RevisionPipeline;

use crate::core::emit::{encode, OutputFormat};
use crate::core::{CodeSet, Storage};
use crate::utils::error::Result;

/// Where and how a pipeline writes its code set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub path: String,
    pub format: OutputFormat,
    pub header: bool,
}

impl OutputOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: OutputFormat::default(),
            header: false,
        }
    }

    pub(crate) async fn write<S: Storage>(&self, storage: &S, code_set: &CodeSet) -> Result<String> {
        let bytes = encode(code_set, self.format, self.header)?;
        tracing::debug!(
            "Writing {} records ({} bytes, {}) to {}",
            code_set.len(),
            bytes.len(),
            self.format,
            self.path
        );
        storage.write_file(&self.path, &bytes).await
    }
}
