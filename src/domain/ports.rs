use crate::domain::model::{Record, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn list_files(&self, dir: &str) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// Endpoints and knobs every pipeline needs; implemented by the CLI args and
/// the TOML config so tests can point the audit at a mock server.
pub trait ConfigProvider: Send + Sync {
    fn site_domain(&self) -> &str;
    /// Prefix for relative listing-card hrefs, e.g. "https://mcp.so".
    fn listing_base_url(&self) -> &str;
    fn github_api_base(&self) -> &str;
    fn github_web_base(&self) -> &str;
    fn output_path(&self) -> &str;
    fn request_timeout_secs(&self) -> u64;
    /// Flat sleep between network iterations; the only pacing there is.
    fn pace_delay_ms(&self) -> u64;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
