use super::client::HttpClient;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// [`HttpClient`] over a plain `reqwest` client.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Result<Self> {
        // The yearly nationwide files are large, hence the generous timeout.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.0.get(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow::anyhow!("GET {} returned status {}", url, status));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
