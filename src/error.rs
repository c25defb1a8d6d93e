//! ==============================================================================
//! error.rs - request error taxonomy
//! ==============================================================================
//!
//! purpose:
//!     every failure a request can hit, and the http response it becomes.
//!     none of these are fatal to the process; they are recovered at the
//!     handler boundary and rendered as a json body.
//!
//! relationships:
//!     - produced by: store.rs (ingest), controls.rs (coercion), api.rs (body parsing)
//!     - rendered by: IntoResponse below, for every axum handler
//!
//! ==============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// a required ingest field is absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// request body is not a json object
    #[error("{0}")]
    Malformed(String),

    /// control value could not be coerced to the field's type
    #[error("Invalid value for {field}: {message}")]
    Coercion { field: String, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MissingField(_) | Error::Malformed(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Coercion { .. } | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, message = %message, "Request failed");
        } else {
            tracing::warn!(status = %status, message = %message, "Request rejected");
        }

        // a missing latest record reads as a message, not an error
        let body = match self {
            Error::NotFound(_) => json!({ "message": message }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
