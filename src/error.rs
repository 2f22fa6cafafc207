use std::sync::Arc;

use thiserror::Error;

/// Misuse of the session lifecycle. These never resolve on their own, so
/// callers should not retry them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("session already initialized")]
    AlreadyInitialized,
    #[error("session not initialized")]
    NotInitialized,
    #[error("download still in progress")]
    AlreadyRunning,
    #[error("download not running")]
    NotRunning,
    #[error("download never started")]
    NotStarted,
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("illegal state: {0}")]
    IllegalState(#[from] StateError),

    #[error("{url} does not support ranged download")]
    NotSupported { url: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("slice task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("download failed: {0}")]
    JobFailed(#[source] Arc<DownloadError>),
}

impl DownloadError {
    pub fn is_state_error(&self) -> bool {
        matches!(self, DownloadError::IllegalState(_))
    }

    /// Errors raised by the HEAD probe before a session exists.
    pub fn is_preflight_error(&self) -> bool {
        matches!(
            self,
            DownloadError::NotSupported { .. } | DownloadError::InvalidResponse(_)
        )
    }

    /// The underlying cause, looking through `JobFailed`.
    pub fn root(&self) -> &DownloadError {
        match self {
            DownloadError::JobFailed(cause) => cause.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err: DownloadError = StateError::AlreadyRunning.into();
        assert!(err.is_state_error());
        assert!(!err.is_preflight_error());
        assert_eq!(err.to_string(), "illegal state: download still in progress");

        let err = DownloadError::NotSupported { url: "http://host/a".into() };
        assert!(err.is_preflight_error());
    }

    #[test]
    fn test_root_unwraps_job_failure() {
        let cause = Arc::new(DownloadError::InvalidResponse("short body".into()));
        let err = DownloadError::JobFailed(cause);
        assert!(matches!(err.root(), DownloadError::InvalidResponse(_)));
        assert_eq!(err.to_string(), "download failed: invalid response: short body");
    }
}
