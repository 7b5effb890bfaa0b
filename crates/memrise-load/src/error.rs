use memrise_acquire::AcquireError;
use thiserror::Error;

/// Why a course load produced no course.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error("failed to load level {level}")]
    Level {
        level: u32,
        #[source]
        source: AcquireError,
    },

    #[error("failed to download {url}")]
    Media {
        url: String,
        #[source]
        source: AcquireError,
    },

    #[error("load cancelled")]
    Cancelled,

    #[error("load task failed: {0}")]
    Worker(String),
}

impl LoadError {
    /// A missing level, which the loader skips rather than fails on.
    pub fn is_level_not_found(&self) -> bool {
        matches!(self, LoadError::Level { source, .. } if source.is_level_not_found())
    }
}
