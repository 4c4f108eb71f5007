use thiserror::Error;

/// Failure taxonomy for a playlist run.
///
/// The orchestrator treats `InvalidPlaylistUrl`, `Connection` and any error
/// raised during setup as fatal; `ToolInvocation` and `Catalog` errors inside
/// the per-entry loop are logged and the loop continues.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid playlist URL: {0}")]
    InvalidPlaylistUrl(String),

    #[error("database connection failed: {0}")]
    Connection(#[source] libsql::Error),

    #[error("catalog error: {0}")]
    Catalog(#[from] libsql::Error),

    #[error("yt-dlp error: {0}")]
    ToolInvocation(String),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
