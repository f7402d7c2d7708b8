use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{PanelError, PanelResult};

/// Something that can stream a remote archive to a local file.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Stream `url` into `dest`, calling `progress` with a percentage when the
    /// total size is known. Returns the number of bytes written.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut (dyn FnMut(u8) + Send),
    ) -> PanelResult<u64>;
}

/// `round(written / total * 100)`, capped at 100.
pub fn progress_percent(written: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (written as f64 / total as f64 * 100.0).round();
    percent.min(100.0) as u8
}

/// Streaming HTTP fetcher backed by a shared `reqwest::Client`.
pub struct HttpArchiveFetcher {
    client: Client,
}

impl HttpArchiveFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> PanelError {
    let message = if err.is_timeout() {
        format!("timed out ({err})")
    } else {
        err.to_string()
    };
    PanelError::Transport {
        url: url.to_string(),
        message,
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut (dyn FnMut(u8) + Send),
    ) -> PanelResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PanelError::io(parent, e))?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        // Without a positive length the UI stays indeterminate.
        let total = response.content_length().filter(|len| *len > 0);

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| PanelError::io(dest, e))?;
        let mut stream = response.bytes_stream();
        let mut written = 0_u64;
        let mut last_percent = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PanelError::io(dest, e))?;
            written = written.saturating_add(chunk.len() as u64);

            if let Some(total) = total {
                let percent = progress_percent(written, total);
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    progress(percent);
                }
            }
        }

        file.flush().await.map_err(|e| PanelError::io(dest, e))?;
        // file is dropped here so the archive can be reopened for validation

        debug!("Downloaded {} bytes: {} -> {:?}", written, url, dest);
        Ok(written)
    }
}
