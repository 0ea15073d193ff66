// web-server/src/error.rs
use actix::MailboxError;
use actix_web::error::JsonPayloadError;
use actix_web::{http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::profile_registry::ProfileError;

/// Error returned by every API handler
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },
    #[error("Registry unavailable: {0}")]
    Mailbox(#[from] MailboxError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::Profile(err) => err.status_code(),
            ApiError::InvalidBody { status, .. } => *status,
            ApiError::Mailbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Auth(err) => err.error_response(),
            ApiError::Profile(err) => err.error_response(),
            ApiError::InvalidBody { status, message } => {
                HttpResponse::build(*status).json(json!({ "error": message }))
            }
            ApiError::Mailbox(err) => {
                tracing::error!("Actor mailbox error: {}", err);
                HttpResponse::InternalServerError().json(json!({ "error": "Internal server error" }))
            }
        }
    }
}

/// `JsonConfig` error handler: bad JSON syntax is a 400, well-formed JSON
/// with the wrong shape (unknown social platform, wrong types) a 422.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let status = match &err {
        JsonPayloadError::Deserialize(e) if e.is_data() => StatusCode::UNPROCESSABLE_ENTITY,
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        _ => StatusCode::BAD_REQUEST,
    };
    tracing::debug!("Rejected JSON body: {}", err);

    ApiError::InvalidBody {
        status,
        message: format!("Invalid request body: {}", err),
    }
    .into()
}
