//! Error types for AiDock

use thiserror::Error;

/// Result type alias for AiDock operations
pub type AiDockResult<T> = Result<T, AiDockError>;

/// Main error type for AiDock
#[derive(Error, Debug)]
pub enum AiDockError {
    /// Page creation refused by the configured limits
    #[error("Page limit reached for '{platform}' (limit {limit})")]
    LimitExceeded { platform: String, limit: usize },

    /// Native window or renderer could not be instantiated
    #[error("Page creation failed: {0}")]
    CreationFailed(String),

    #[error("Load failed for {url}: {reason}")]
    LoadFailed { url: String, reason: String },

    /// Persisted JSON could not be read; callers fall back to defaults
    #[error("Configuration corrupt: {0}")]
    ConfigCorrupt(String),

    #[error("Hotkey capture aborted")]
    BindingCaptureAborted,

    /// Pages cannot change while session restore holds its batch
    #[error("Session restore in progress")]
    RestoreInProgress,

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AiDockError {
    /// Create a new creation-failed error
    pub fn creation(msg: impl Into<String>) -> Self {
        Self::CreationFailed(msg.into())
    }

    /// Create a new load-failed error
    pub fn load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new corrupt-config error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::ConfigCorrupt(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Errors the shell recovers from without surfacing anything to the user
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LimitExceeded { .. }
                | Self::ConfigCorrupt(_)
                | Self::BindingCaptureAborted
                | Self::RestoreInProgress
        )
    }
}
