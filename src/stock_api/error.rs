use thiserror::Error;

/// Failures of a stock service call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered 400: it does not know the identifier.
    #[error("bad request")]
    NotFound,

    #[error("internal server error")]
    ServerFault,

    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),

    /// Wrong content type or a body that does not decode into the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// True when the service says the identifier does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}
