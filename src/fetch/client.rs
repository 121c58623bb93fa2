use anyhow::Result;
use async_trait::async_trait;

/// Anything that can download the body behind a URL.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
