//! Error Handling Module
//!
//! Provides type-safe error handling with proper HTTP status code mapping.
//! Engine and prover errors are translated here; internal details are
//! logged, never returned to the client.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{EngineError, ProverError};

#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ============ 401 Unauthorized ============
    #[error("Authentication required")]
    Unauthorized,

    // ============ 404 Not Found ============
    #[error("Resource not found: {0}")]
    NotFound(String),

    // ============ 409 Conflict ============
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ 422 Unprocessable Entity ============
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    // ============ 500 Internal Server Error ============
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal server error")]
    InternalError,
}

/// Error body returned to clients
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            ApiError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(msg.clone()),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
                None,
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
                None,
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                msg.clone(),
                None,
            ),
            ApiError::InvalidProof(reason) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_PROOF",
                "Proof rejected".to_string(),
                Some(reason.clone()),
            ),

            // 5xx: details stay in the logs
            ApiError::StorageError(_) => {
                tracing::error!("Storage error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Storage error occurred".to_string(),
                    None,
                )
            }
            ApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unauthorized => ApiError::Unauthorized,
            EngineError::NotBound(subject) => ApiError::NotFound(format!("Profile {}", subject)),
            EngineError::AlreadyBound(_)
            | EngineError::ReplayedProof
            | EngineError::Conflict(_)
            | EngineError::InconsistentLoanHistory(_) => ApiError::Conflict(err.to_string()),
            EngineError::InvalidProof(reason) => ApiError::InvalidProof(reason.to_string()),
            EngineError::Circuit(e) => ApiError::InvalidProof(e.to_string()),
            EngineError::UnknownTier(tier) => ApiError::BadRequest(format!("Unknown tier {}", tier)),
            EngineError::Storage(msg) => ApiError::StorageError(msg),
        }
    }
}

impl From<ProverError> for ApiError {
    fn from(err: ProverError) -> Self {
        match err {
            ProverError::Malformed(e) => ApiError::BadRequest(e.to_string()),
            ProverError::UnsupportedSystem(system) => {
                ApiError::BadRequest(format!("Proof system {} is not enabled", system))
            }
            ProverError::Circuit(e) => ApiError::ValidationError(e.to_string()),
            ProverError::Backend(e) => {
                tracing::error!("Prover backend error: {:#}", e);
                ApiError::InternalError
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Anyhow error: {:?}", err);
        ApiError::InternalError
    }
}
