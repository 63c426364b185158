use thiserror::Error;

/// How a failed operation should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Errors raised by the editor engine.
///
/// None of these are fatal: in every case the live document is left exactly
/// as it was before the failing call.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Malformed text handed to the serialization bridge.
    #[error("invalid configuration text: {message}")]
    Parse { message: String },

    /// Structurally valid input that fails a semantic check.
    #[error("{path}: {message}")]
    Validation { path: String, message: String },

    #[error("provider \"{0}\" already exists, choose another name")]
    ProviderExists(String),

    #[error("provider \"{0}\" does not exist")]
    ProviderNotFound(String),

    #[error("model #{index} does not exist in provider \"{provider}\"")]
    ModelNotFound { provider: String, index: usize },

    #[error("channel \"{0}\" does not exist")]
    ChannelNotFound(String),

    #[error("unknown channel type: {0}")]
    InvalidChannelType(String),

    #[error("fallback #{0} does not exist")]
    FallbackNotFound(usize),

    /// Revert requested before any snapshot was committed.
    #[error("no cached version to revert to")]
    NoBaseline,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl EditorError {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::NoBaseline => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
