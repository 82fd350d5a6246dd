//! Error types for the adaptive cache eviction engine

use thiserror::Error;

/// Result type alias
pub type CacheExtResult<T> = Result<T, CacheExtError>;

/// Startup and configuration errors.
///
/// Per the error handling design, only startup failures are surfaced as
/// `Result`s. Transient and invariant-breach conditions at steady state are
/// absorbed internally and counted, never returned.
#[derive(Error, Debug)]
pub enum CacheExtError {
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("watch directory does not exist: {0}")]
    WatchDirNotFound(String),

    #[error("watch directory path too long ({len} bytes, max {max}): {path}")]
    WatchDirPathTooLong {
        path: String,
        len: usize,
        max: usize,
    },

    #[error("failed to open cgroup path {path}: {source}")]
    CgroupOpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to allocate policy list registry: {0}")]
    ListAllocationFailed(String),

    #[error("failed to attach hook surface to cgroup: {0}")]
    HookAttachFailed(String),
}

impl CacheExtError {
    /// Whether this error originates from engine/host initialization,
    /// i.e. should be reported to stderr and exit the process with 1.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            CacheExtError::MissingArgument(_)
                | CacheExtError::WatchDirNotFound(_)
                | CacheExtError::WatchDirPathTooLong { .. }
                | CacheExtError::CgroupOpenFailed { .. }
                | CacheExtError::ListAllocationFailed(_)
                | CacheExtError::HookAttachFailed(_)
        )
    }
}
