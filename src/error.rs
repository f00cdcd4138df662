use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Error taxonomy for the client SDK.
///
/// The request gateway never surfaces these directly: every HTTP outcome is
/// normalized into an [`crate::http::Envelope`], and callers branch on its
/// `error` field. `ClientError` is what an envelope converts into via
/// [`crate::http::Envelope::into_result`], plus the failure modes that exist
/// outside the gateway (realtime publish, configuration, persistence).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("Request timeout")]
    Timeout,

    #[error("unauthorized")]
    Unauthorized,

    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// HTTP status associated with this error, where one exists.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized => Some(401),
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
