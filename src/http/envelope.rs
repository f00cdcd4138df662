use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Pagination metadata, surfaced unchanged from list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Normalized result of every gateway call.
///
/// Exactly one of `data` / `error` is populated after resolution. Callers
/// branch on `error` instead of catching anything: a transport failure, a
/// timeout and a non-2xx response all land here the same way. `meta` is
/// present only for paginated list endpoints.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub status: Option<u16>,
    pub meta: Option<PageMeta>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: None,
            meta: None,
        }
    }

    pub fn ok_with_meta(data: T, meta: PageMeta) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: None,
            meta: Some(meta),
        }
    }

    pub fn err(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            status,
            meta: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result` for callers who prefer `?` over branching
    /// on `error`.
    pub fn into_result(self) -> Result<T, ClientError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(message)) => Err(match self.status {
                Some(401) => ClientError::Unauthorized,
                Some(status) => ClientError::Http { status, message },
                None if message == "Request timeout" => ClientError::Timeout,
                None => ClientError::Transport(message),
            }),
            (None, None) => Err(ClientError::Transport("empty envelope".to_string())),
        }
    }

    /// Map the payload, keeping error/status/meta untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Envelope<U> {
        Envelope {
            data: self.data.map(f),
            error: self.error,
            status: self.status,
            meta: self.meta,
        }
    }
}
