//! HTTP download of the yearly county case files.

mod basic;
mod client;
pub mod county;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;
use tracing::debug;

/// Downloads `url` through `client`.
#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let started = std::time::Instant::now();
    let bytes = client.get_bytes(url).await?;
    debug!(
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Download finished"
    );
    Ok(bytes)
}
