// ─── Download Task ───
// Fetches a versioned server archive in the background, validates and
// installs it, retrying the whole sequence on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::archive::install_archive;
use super::client::{ArchiveFetcher, HttpArchiveFetcher};
use crate::core::error::{PanelError, PanelResult};
use crate::core::events::{self, EventSender, PanelEvent};
use crate::core::version::validate_version_id;

pub const DEFAULT_DOWNLOAD_HOST: &str = "www.minecraft.net";
pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Which part of the pipeline produced the final error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    HttpStatus,
    Transport,
    Archive,
    Other,
}

impl FailureKind {
    fn of(error: &PanelError) -> Self {
        match error {
            PanelError::HttpStatus { .. } => FailureKind::HttpStatus,
            PanelError::Transport { .. } => FailureKind::Transport,
            PanelError::Archive(_)
            | PanelError::ArchiveTooSmall { .. }
            | PanelError::MissingArchiveEntry(_)
            | PanelError::ExtractionIncomplete(_) => FailureKind::Archive,
            _ => FailureKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Success {
        message: String,
        install_dir: PathBuf,
    },
    Failure {
        kind: FailureKind,
        message: String,
        attempts: u32,
    },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success { .. })
    }

    fn failure(error: &PanelError, attempts: u32) -> Self {
        let kind = FailureKind::of(error);
        let message = match (kind, error) {
            (
                FailureKind::HttpStatus,
                PanelError::HttpStatus { status, reason, .. },
            ) => format!("HTTP error {status} {reason}"),
            (FailureKind::Transport, PanelError::Transport { message, .. }) => {
                format!("Network error: {message}")
            }
            (FailureKind::Archive, err) => format!("Invalid archive: {err}"),
            (_, err) => format!("Download failed: {err}"),
        };
        DownloadOutcome::Failure {
            kind,
            message,
            attempts,
        }
    }
}

/// Handle to a running download. The outcome is also delivered as a
/// `DownloadFinished` event.
pub struct DownloadTask {
    pub id: String,
    pub version: String,
    pub dest_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    handle: JoinHandle<DownloadOutcome>,
}

impl DownloadTask {
    pub async fn join(self) -> DownloadOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => DownloadOutcome::failure(&PanelError::Other(e.to_string()), 0),
        }
    }
}

/// Starts server downloads. No locking: callers must not run two downloads
/// into the same destination at once.
pub struct ServerDownloader {
    fetcher: Arc<dyn ArchiveFetcher>,
    host: String,
    staging_dir: PathBuf,
    max_attempts: u32,
    retry_delay: Duration,
    events: EventSender,
}

impl ServerDownloader {
    pub fn new(client: Client, host: impl Into<String>, events: EventSender) -> Self {
        Self::with_fetcher(Arc::new(HttpArchiveFetcher::new(client)), host, events)
    }

    pub fn with_fetcher(
        fetcher: Arc<dyn ArchiveFetcher>,
        host: impl Into<String>,
        events: EventSender,
    ) -> Self {
        Self {
            fetcher,
            host: host.into(),
            staging_dir: std::env::temp_dir().join("bedrock-panel"),
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
            events,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_staging_dir(mut self, dir: PathBuf) -> Self {
        self.staging_dir = dir;
        self
    }

    pub fn archive_url(&self, version: &str) -> String {
        format!(
            "https://{}/bedrockdedicatedserver/bin-win/bedrock-server-{}.zip",
            self.host, version
        )
    }

    /// Validate `version` and start downloading it into `dest_dir/version/`
    /// on a background task. A malformed version fails here, before any
    /// network activity.
    pub fn download(&self, version: &str, dest_dir: &Path) -> PanelResult<DownloadTask> {
        validate_version_id(version)?;

        let id = Uuid::new_v4().to_string();
        let job = DownloadJob {
            fetcher: Arc::clone(&self.fetcher),
            url: self.archive_url(version),
            task_id: id.clone(),
            version: version.to_string(),
            archive_path: self.staging_dir.join(format!("{id}.zip")),
            install_dir: dest_dir.join(version),
            max_attempts: self.max_attempts,
            retry_delay: self.retry_delay,
            events: self.events.clone(),
        };

        info!("Starting download of server {} from {}", version, job.url);
        let handle = tokio::spawn(job.run());

        Ok(DownloadTask {
            id,
            version: version.to_string(),
            dest_dir: dest_dir.to_path_buf(),
            started_at: Utc::now(),
            handle,
        })
    }
}

struct DownloadJob {
    fetcher: Arc<dyn ArchiveFetcher>,
    url: String,
    task_id: String,
    version: String,
    archive_path: PathBuf,
    install_dir: PathBuf,
    max_attempts: u32,
    retry_delay: Duration,
    events: EventSender,
}

impl DownloadJob {
    async fn run(self) -> DownloadOutcome {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
            }

            let result = self.attempt().await;
            let _ = tokio::fs::remove_file(&self.archive_path).await;

            match result {
                Ok(executable) => {
                    info!(
                        "Server {} installed at {:?} (attempt {})",
                        self.version, executable, attempt
                    );
                    let outcome = DownloadOutcome::Success {
                        message: format!("Server {} downloaded and installed", self.version),
                        install_dir: self.install_dir.clone(),
                    };
                    self.finish(outcome.clone());
                    return outcome;
                }
                Err(e) => {
                    warn!(
                        "Download attempt {}/{} for {} failed: {}",
                        attempt, self.max_attempts, self.version, e
                    );
                    last_error = Some(e);
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| PanelError::Other("no download attempt was made".into()));
        error!("Download of server {} failed: {}", self.version, error);
        let outcome = DownloadOutcome::failure(&error, self.max_attempts);
        self.finish(outcome.clone());
        outcome
    }

    async fn attempt(&self) -> PanelResult<PathBuf> {
        let mut report = |percent: u8| {
            events::emit(
                &self.events,
                PanelEvent::DownloadProgress {
                    task_id: self.task_id.clone(),
                    version: self.version.clone(),
                    percent,
                },
            );
        };
        self.fetcher
            .fetch(&self.url, &self.archive_path, &mut report)
            .await?;

        let archive = self.archive_path.clone();
        let install_dir = self.install_dir.clone();
        tokio::task::spawn_blocking(move || install_archive(&archive, &install_dir))
            .await
            .map_err(|e| PanelError::Other(format!("Task join error: {e}")))?
    }

    fn finish(&self, outcome: DownloadOutcome) {
        events::emit(
            &self.events,
            PanelEvent::DownloadFinished {
                task_id: self.task_id.clone(),
                version: self.version.clone(),
                outcome,
            },
        );
    }
}
