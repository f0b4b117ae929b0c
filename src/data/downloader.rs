// src/data/downloader.rs
//! Downloads the liquidity snapshot to disk with a progress bar.

use crate::error::SyncError;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub async fn download_file(url: &str, filepath: &Path) -> Result<u64, SyncError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| SyncError::Config(format!("invalid snapshot URL '{}': {}", url, e)))?;
    let client = reqwest::Client::new();
    let mut response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| SyncError::Download(format!("failed to request {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::Download(format!("bad status from {}: {}", url, status)));
    }

    let progress = progress_bar(response.content_length());
    let mut file = tokio::fs::File::create(filepath).await.map_err(|e| {
        SyncError::Io(format!("failed to create {}: {}", filepath.display(), e))
    })?;

    let mut downloaded: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }
    file.flush().await?;
    progress.finish_and_clear();

    info!("Downloaded {} bytes to {}", downloaded, filepath.display());
    Ok(downloaded)
}

fn progress_bar(content_length: Option<u64>) -> ProgressBar {
    match content_length {
        Some(total) if total > 0 => {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        }
        _ => {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] Downloading {bytes}")
            {
                spinner.set_style(style);
            }
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        }
    }
}
