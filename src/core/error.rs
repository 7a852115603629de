use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the whole sync engine.
/// Every module returns `Result<T, SyncError>`.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Path escapes the local store: {0}")]
    UnsafePath(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("No repository could serve {path}")]
    FetchExhausted { path: String },

    #[error("Not present in the local store: {path}")]
    NotCached { path: String },

    // ── Maven ───────────────────────────────────────────
    #[error("Malformed coordinate: {0}")]
    MalformedCoordinate(String),

    #[error("Malformed metadata document: {0}")]
    MalformedMetadata(String),

    #[error("Malformed POM: {0}")]
    MalformedPom(String),

    #[error("Cannot resolve a version for {0}")]
    UnresolvableVersion(String),

    // ── Configuration ───────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type SyncResult<T> = Result<T, SyncError>;

impl From<std::io::Error> for SyncError {
    fn from(source: std::io::Error) -> Self {
        SyncError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
