//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use domain::{DomainError, OrderError};
use lifecycle::LifecycleError;

/// API-level error type that maps to HTTP responses.
///
/// Bodies are `{"error": <kind>, "detail": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Placement or status change failed.
    Lifecycle(LifecycleError),
    /// Catalog read failed.
    Catalog(CatalogError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, detail) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "InvalidRequest", msg),
            ApiError::Lifecycle(err) => lifecycle_error_to_response(err),
            ApiError::Catalog(err) => catalog_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %detail, kind, "internal server error");
        }

        let body = serde_json::json!({ "error": kind, "detail": detail });
        (status, axum::Json(body)).into_response()
    }
}

fn lifecycle_error_to_response(err: LifecycleError) -> (StatusCode, &'static str, String) {
    let kind = err.kind();
    let status = match kind {
        "InvalidRequest" => StatusCode::BAD_REQUEST,
        "ProductNotFound" | "OrderNotFound" => StatusCode::NOT_FOUND,
        "InsufficientStock" | "InvalidTransition" | "Conflict" => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, kind, err.to_string())
}

fn catalog_error_to_response(err: CatalogError) -> (StatusCode, &'static str, String) {
    match &err {
        CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "ProductNotFound", err.to_string()),
        CatalogError::InvalidProduct(_) => {
            (StatusCode::BAD_REQUEST, "InvalidRequest", err.to_string())
        }
        CatalogError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, "InsufficientStock", err.to_string())
        }
        CatalogError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "CatalogFailure",
            err.to_string(),
        ),
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError::Lifecycle(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Lifecycle(LifecycleError::Ledger(DomainError::Order(err)))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
