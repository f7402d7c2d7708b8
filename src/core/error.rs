use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the panel backend.
/// Every module returns `Result<T, PanelError>`.
#[derive(Debug, Error)]
pub enum PanelError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Validation ──────────────────────────────────────
    #[error("Invalid server version '{0}': expected four dot-separated numbers")]
    InvalidVersion(String),

    #[error("Server version not installed: {0}")]
    VersionNotFound(String),

    #[error("No server version selected")]
    NoVersionSelected,

    #[error("Invalid value for {key}: {reason}")]
    InvalidProperty { key: &'static str, reason: String },

    // ── Network ─────────────────────────────────────────
    #[error("Download failed for {url}: HTTP {status} {reason}")]
    HttpStatus {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Network error for {url}: {message}")]
    Transport { url: String, message: String },

    // ── Integrity ───────────────────────────────────────
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Downloaded archive is only {size} bytes, probably an error page")]
    ArchiveTooSmall { size: u64 },

    #[error("Archive does not contain {0}")]
    MissingArchiveEntry(String),

    #[error("Extraction incomplete: {0:?} not found")]
    ExtractionIncomplete(PathBuf),

    // ── Process ─────────────────────────────────────────
    #[error("Server executable not found: {0:?}")]
    ExecutableNotFound(PathBuf),

    #[error("Server is already running")]
    ServerAlreadyRunning,

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type PanelResult<T> = Result<T, PanelError>;

/// Coarse classification used for user feedback and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    TransientNetwork,
    Integrity,
    ProcessLaunch,
    Io,
    Other,
}

impl PanelError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PanelError::InvalidVersion(_)
            | PanelError::VersionNotFound(_)
            | PanelError::NoVersionSelected
            | PanelError::InvalidProperty { .. } => ErrorCategory::Validation,
            PanelError::HttpStatus { .. } | PanelError::Transport { .. } => {
                ErrorCategory::TransientNetwork
            }
            PanelError::Archive(_)
            | PanelError::ArchiveTooSmall { .. }
            | PanelError::MissingArchiveEntry(_)
            | PanelError::ExtractionIncomplete(_) => ErrorCategory::Integrity,
            PanelError::ExecutableNotFound(_) | PanelError::ServerAlreadyRunning => {
                ErrorCategory::ProcessLaunch
            }
            PanelError::Io { .. } => ErrorCategory::Io,
            PanelError::Json(_) | PanelError::Other(_) => ErrorCategory::Other,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PanelError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for PanelError {
    fn from(source: std::io::Error) -> Self {
        PanelError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for Tauri IPC ─────────────────────────
// Tauri commands require the error type to implement `Serialize`.
impl serde::Serialize for PanelError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
