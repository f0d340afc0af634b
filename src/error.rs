//! The error taxonomy of a request attempt.

/// A failure that reaches the caller, either as local state or through a boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The remote endpoint answered with a non-success status.
    #[error("{message} ({status})")]
    Service { status: u16, message: String },
    /// The call did not complete: connectivity, decoding or middleware failure.
    #[error("{message}")]
    Transport { message: String },
}

impl ApiError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        ApiError::Service {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ApiError::Transport {
            message: message.into(),
        }
    }

    /// Status code of a service failure; `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Service { status, .. } => Some(*status),
            ApiError::Transport { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Service { message, .. } | ApiError::Transport { message } => message,
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self, ApiError::Service { .. })
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::transport(format!("{err:#}"))
    }
}

/// What a transport call can fail with.
///
/// `Cancelled` is deliberately not an [`ApiError`]: an abandoned attempt is
/// absorbed by the engine and never shown to anyone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request was cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Failed(err.to_string())
    }
}
