use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::service;

/// Errors returned from handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] service::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_type: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        use service::Error as E;
        match self {
            ApiError::Service(E::UnsupportedFormat { .. } | E::InvalidNetwork(_) | E::InvalidRequest(_))
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(E::SessionNotFound | E::NoResultsAvailable(_) | E::UnknownExample(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Service(E::Io(_) | E::Serialization(_) | E::Export(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_type(&self) -> &'static str {
        use service::Error as E;
        match self {
            ApiError::Service(e) => match e {
                E::UnsupportedFormat { .. } => "UnsupportedFormat",
                E::InvalidNetwork(_) => "InvalidNetwork",
                E::InvalidRequest(_) => "InvalidRequest",
                E::SessionNotFound => "SessionNotFound",
                E::NoResultsAvailable(_) => "NoResultsAvailable",
                E::UnknownExample(_) => "UnknownExample",
                E::Io(_) | E::Serialization(_) | E::Export(_) => "InternalServerError",
            },
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Internal(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if status.is_server_error() {
            tracing::error!(error = %self, "API error occurred");
            "An internal error occurred".to_string()
        } else {
            tracing::debug!(error = %self, "Client error");
            self.to_string()
        };
        let body = ErrorResponse {
            detail,
            error_type: self.error_type().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn status_codes() {
        let cases = [
            (
                ApiError::from(service::Error::UnsupportedFormat {
                    supported: ".json".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                service::Error::InvalidNetwork("x".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (service::Error::SessionNotFound.into(), StatusCode::NOT_FOUND),
            (service::Error::no_results().into(), StatusCode::NOT_FOUND),
            (
                service::Error::UnknownExample("x".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                service::Error::Export("disk".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn error_types() {
        assert_eq!(
            ApiError::from(service::Error::SessionNotFound).error_type(),
            "SessionNotFound"
        );
        assert_eq!(ApiError::BadRequest("x".into()).error_type(), "BadRequest");
        assert_eq!(
            ApiError::from(service::Error::Export("x".into())).error_type(),
            "InternalServerError"
        );
    }

    #[test]
    fn display_passes_service_messages_through() {
        let err = ApiError::from(service::Error::no_results());
        assert_eq!(err.to_string(), "No results available. Run power flow first.");
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let response = ApiError::from(service::Error::Export("/tmp/secret".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.detail, "An internal error occurred");
        assert_eq!(body.error_type, "InternalServerError");
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let response = ApiError::from(service::Error::SessionNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.detail, "Session not found");
        assert_eq!(body.error_type, "SessionNotFound");
    }
}
