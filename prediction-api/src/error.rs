//! HTTP error envelope.
//!
//! Every failure leaves the service as
//! `{ "error": true, "message", "status_code", "details": {..}, "timestamp" }`.

use std::collections::BTreeMap;

use air_quality_core::{AirQualityError, ErrorKind};
use axum::{
    extract::rejection::JsonRejection,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
    pub status_code: u16,
    pub details: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] AirQualityError),

    /// Body could not be decoded into the expected request shape.
    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error("{0}")]
    NotFound(String),

    /// Known route, unsupported verb.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: Method, path: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String, BTreeMap<String, String>) {
        match self {
            ApiError::Domain(e) => {
                let status = match e.kind() {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorKind::Internal => {
                        error!(error = %e, "request failed");
                        return (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into(), BTreeMap::new());
                    }
                };
                (status, e.to_string(), e.details())
            }
            ApiError::Body(rejection) => {
                warn!(error = %rejection, "malformed request body");
                let mut details = BTreeMap::new();
                details.insert("body".to_string(), rejection.body_text());
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "request body could not be processed".to_string(),
                    details,
                )
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone(), BTreeMap::new()),
            ApiError::MethodNotAllowed { .. } => {
                (StatusCode::METHOD_NOT_ALLOWED, self.to_string(), BTreeMap::new())
            }
            ApiError::Internal(detail) => {
                error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into(), BTreeMap::new())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = self.parts();
        let body = ErrorBody {
            error: true,
            message,
            status_code: status.as_u16(),
            details,
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}
