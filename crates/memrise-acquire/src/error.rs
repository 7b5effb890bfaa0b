use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the Memrise client.
///
/// Retries happen inside the client; whatever reaches the caller is final.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("not a Memrise course URL: {0} (expected https://community-courses.memrise.com/community/course/<id>/<name>/)")]
    InvalidCourseUrl(String),

    #[error("level {level} not found")]
    LevelNotFound { level: u32 },

    #[error("can't get level count from {url}")]
    MissingLevelCount { url: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: reqwest::StatusCode },

    #[error("request to {url} failed after {attempts} attempt(s)")]
    Network {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected payload from {url}")]
    Payload {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl AcquireError {
    /// The recoverable per-level case the loader skips over.
    pub fn is_level_not_found(&self) -> bool {
        matches!(self, AcquireError::LevelNotFound { .. })
    }
}

pub type Result<T, E = AcquireError> = std::result::Result<T, E>;
