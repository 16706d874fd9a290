use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// JSON body every failed request carries.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Everything a handler can fail with, mapped onto the status codes the
/// frontend expects. Invalid credentials and unknown reset targets are
/// 400; only bearer-auth failures and expired reset tokens are 401.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required request fields absent or empty, or a habit store failure.
    #[error("{0}")]
    BadRequest(&'static str),
    /// Register hit an already-taken email.
    #[error("Email already in use")]
    Conflict,
    /// Unknown email or wrong password; a single message covers both.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Forgot-password target does not exist.
    #[error("User not found")]
    NotFound,
    /// Bearer auth failed at the boundary.
    #[error("{0}")]
    Unauthorized(&'static str),
    /// Reset token past its expiry.
    #[error("Reset token expired")]
    TokenExpired,
    /// Reset token failed signature, shape or kind checks.
    #[error("Invalid reset token")]
    TokenInvalid,
    /// Store, mailer or crypto failure; details stay server-side.
    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Conflict
            | ApiError::InvalidCredentials
            | ApiError::NotFound
            | ApiError::TokenInvalid => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            error!(error = ?err, "request failed");
        }
        let body = Json(ErrorBody {
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// Failures the persistence layer distinguishes. Everything the flows do
/// not inspect stays inside `Other`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // Only user creation reports Duplicate: the UNIQUE constraint
            // catching a registration race.
            StoreError::Duplicate => ApiError::Conflict,
            // Only password update reports NotFound: the user row vanished
            // under a still-valid reset token.
            StoreError::NotFound => {
                ApiError::Internal(anyhow::anyhow!("user row missing on password update"))
            }
            StoreError::Other(e) => ApiError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_the_frontend_contract() {
        assert_eq!(
            ApiError::BadRequest("Missing fields").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TokenInvalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Unauthorized("Missing Authorization header").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_never_leaks_its_source() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        assert_eq!(err.to_string(), "Server error");
    }

    #[test]
    fn error_body_serializes_as_message_object() {
        let body = ErrorBody {
            message: ApiError::Conflict.to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"message":"Email already in use"}"#);
    }

    #[test]
    fn store_errors_map_per_flow_semantics() {
        assert!(matches!(
            ApiError::from(StoreError::Duplicate),
            ApiError::Conflict
        ));
        assert!(matches!(
            ApiError::from(StoreError::NotFound),
            ApiError::Internal(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Other(anyhow::anyhow!("db down"))),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn responses_carry_the_mapped_status() {
        let resp = ApiError::TokenExpired.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = ApiError::Conflict.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
