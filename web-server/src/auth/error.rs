// web-server/src/auth/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use siwe_common::seal::SealError;
use siwe_common::siwe::SiweError;
use thiserror::Error;

/// Failures of the sign-in handshake
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing message or signature")]
    MissingCredentials,
    #[error("No session found")]
    NoSession,
    #[error("Invalid or expired session")]
    SessionUnsealFailure(#[source] SealError),
    #[error("Malformed SIWE message: {0}")]
    MalformedMessage(#[source] SiweError),
    #[error("Invalid signature")]
    InvalidSignature(#[source] SiweError),
    #[error("SIWE message expired")]
    MessageExpired,
    #[error("SIWE message is not yet valid")]
    MessageNotYetValid,
    #[error("SIWE message domain {actual} does not match {expected}")]
    DomainMismatch { expected: String, actual: String },
    #[error("Invalid nonce")]
    NonceMismatch,
    #[error("Failed to seal session")]
    Seal(#[source] SealError),
}

impl From<SiweError> for AuthError {
    fn from(err: SiweError) -> Self {
        match err {
            SiweError::Expired => AuthError::MessageExpired,
            SiweError::NotYetValid => AuthError::MessageNotYetValid,
            SiweError::DomainMismatch { expected, actual } => {
                AuthError::DomainMismatch { expected, actual }
            }
            err if err.is_malformed() => AuthError::MalformedMessage(err),
            err => AuthError::InvalidSignature(err),
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials | AuthError::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            AuthError::NoSession
            | AuthError::SessionUnsealFailure(_)
            | AuthError::InvalidSignature(_)
            | AuthError::MessageExpired
            | AuthError::MessageNotYetValid
            | AuthError::DomainMismatch { .. } => StatusCode::UNAUTHORIZED,
            AuthError::NonceMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Seal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("Session error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siwe_errors_are_classified() {
        assert!(matches!(
            AuthError::from(SiweError::InvalidHeader),
            AuthError::MalformedMessage(_)
        ));
        assert!(matches!(
            AuthError::from(SiweError::SignatureFormat("short".into())),
            AuthError::InvalidSignature(_)
        ));
        assert!(matches!(
            AuthError::from(SiweError::UnsupportedVersion("2".into())),
            AuthError::MalformedMessage(_)
        ));
        assert!(matches!(
            AuthError::from(SiweError::SignatureRecovery("bad v".into())),
            AuthError::InvalidSignature(_)
        ));
        assert!(matches!(AuthError::from(SiweError::Expired), AuthError::MessageExpired));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::NoSession.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::NonceMismatch.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            AuthError::Seal(SealError::Encrypt).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
