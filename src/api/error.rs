use serde_json::json;
use thiserror::Error;

use super::http::Response;

/// Everything a handler can fail with, already shaped for the wire.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request fields. The message names the field.
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Request body too large")]
    PayloadTooLarge,
    /// The store failed underneath an operation. `details` carries the full
    /// context chain, which is fine for a single-user tool.
    #[error("{message}: {details}")]
    Internal {
        message: &'static str,
        details: String,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Adapter for `map_err` that tags a persistence failure with the
    /// operation that was attempted.
    pub fn internal(message: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |err| ApiError::Internal {
            message,
            details: format!("{err:#}"),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::PayloadTooLarge => 413,
            ApiError::Internal { .. } => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Internal { message, details } => json!({
                "error": message,
                "details": details,
            }),
            other => json!({ "error": other.to_string() }),
        };
        Response::json(status, body)
    }
}
