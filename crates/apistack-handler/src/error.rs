//! Handler errors.

use thiserror::Error;

pub type HandlerResult<T> = Result<T, HandlerError>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HandlerError {
    /// HTTP status the proxy response carries for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedBody(_) => 400,
            Self::MethodNotAllowed(_) => 405,
            Self::InvalidCredential(_) | Self::Serialization(_) => 500,
        }
    }
}
