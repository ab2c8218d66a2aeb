use crate::domain::model::CodeSet;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the body. Non-success statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Raw: Send;

    async fn fetch(&self) -> Result<Self::Raw>;
    async fn parse(&self, raw: Self::Raw) -> Result<CodeSet>;
    /// Returns the path the code set was written to.
    async fn emit(&self, code_set: &CodeSet) -> Result<String>;
}
