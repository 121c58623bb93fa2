use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

use super::{HttpClient, fetch_bytes};
use crate::config::CountyTarget;
use crate::sources::county::filter_county_csv;

/// Rows kept from one downloaded year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearDownload {
    pub year: i32,
    pub url: String,
    pub rows: u64,
}

/// Downloads one county file per year, keeps only `target`'s rows and writes
/// them as a single CSV at `dest` with the source header.
///
/// A year that fails to download or parse is logged and skipped. Fails only
/// when no year could be fetched.
#[tracing::instrument(
    skip_all,
    fields(years = ?years, county = %target.county, state = %target.state, dest = %dest.display())
)]
pub async fn download_county<C: HttpClient + ?Sized>(
    client: &C,
    years: &[i32],
    url_template: &str,
    target: &CountyTarget,
    dest: &Path,
) -> Result<Vec<YearDownload>> {
    let mut combined = Vec::new();
    let mut downloads = Vec::new();

    for &year in years {
        let url = url_template.replace("{year}", &year.to_string());
        info!(year, url = %url, "Starting county download");

        let bytes = match fetch_bytes(client, &url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(year, error = %e, "County download failed");
                continue;
            }
        };

        let write_header = downloads.is_empty();
        let mut chunk = Vec::new();
        match filter_county_csv(bytes.as_slice(), &mut chunk, target, write_header) {
            Ok(rows) => {
                info!(year, rows, "County rows extracted");
                combined.extend(chunk);
                downloads.push(YearDownload { year, url, rows });
            }
            Err(e) => {
                error!(year, error = %e, "County file could not be filtered");
            }
        }
    }

    if downloads.is_empty() {
        bail!("none of the {} requested years could be downloaded", years.len());
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(dest, combined).with_context(|| format!("writing {}", dest.display()))?;

    Ok(downloads)
}
