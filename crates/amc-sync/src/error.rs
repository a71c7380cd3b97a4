use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },
    #[error("{path} answered with status {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("malformed response from {path}: {message}")]
    Decode { path: String, message: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("synchronizer already initialized")]
    AlreadyInitialized,
    #[error("scan already in progress")]
    ScanInProgress,
    #[error("synchronizer has been torn down")]
    Disposed,
}

impl SyncError {
    /// Stable label for the `kind` field of log events.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Transport { .. } => "transport",
            SyncError::Status { .. } => "status",
            SyncError::Decode { .. } => "decode",
            SyncError::InvalidRequest(_) => "invalid_request",
            SyncError::AlreadyInitialized => "already_initialized",
            SyncError::ScanInProgress => "scan_in_progress",
            SyncError::Disposed => "disposed",
        }
    }

    pub(crate) fn decode(path: &str, err: impl std::fmt::Display) -> Self {
        SyncError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}
