pub mod archive;
pub mod client;
pub mod task;

pub use archive::{install_archive, MIN_ARCHIVE_BYTES};
pub use client::{ArchiveFetcher, HttpArchiveFetcher};
pub use task::{
    DownloadOutcome, DownloadTask, FailureKind, ServerDownloader, DEFAULT_DOWNLOAD_HOST,
};
