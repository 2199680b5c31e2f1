//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::dispatch::DispatchError;
use parley_types::error::{NluError, StoreError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Dispatch(DispatchError),
    Store(StoreError),
    Nlu(NluError),
    /// Session lookup requested while persistence is off.
    PersistenceDisabled,
    Validation(String),
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::Dispatch(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<NluError> for AppError {
    fn from(e: NluError) -> Self {
        AppError::Nlu(e)
    }
}

impl AppError {
    /// Status, machine-readable code, and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Dispatch(DispatchError::Persistence { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PERSISTENCE_ERROR",
                self.message(),
            ),
            AppError::Dispatch(DispatchError::Middleware(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MIDDLEWARE_ERROR",
                self.message(),
            ),
            AppError::Store(StoreError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                format!("Session '{id}' not found"),
            ),
            AppError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PERSISTENCE_ERROR",
                self.message(),
            ),
            AppError::Nlu(_) => (StatusCode::BAD_GATEWAY, "NLU_ERROR", self.message()),
            AppError::PersistenceDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PERSISTENCE_DISABLED",
                "Session tracking is not configured".to_string(),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Dispatch(e) => e.to_string(),
            AppError::Store(e) => e.to_string(),
            AppError::Nlu(e) => e.to_string(),
            AppError::PersistenceDisabled => "persistence disabled".to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }
        (status, Json(ApiResponse::error(code, message))).into_response()
    }
}
