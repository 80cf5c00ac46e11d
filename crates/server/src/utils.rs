use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use registry::RegistryError;

use crate::state::ErrorResponse;

pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn json_error_response(status: StatusCode, message: impl Into<String>) -> Response {
    json_error(status, message).into_response()
}

/// Maps registry failures onto HTTP statuses. Mutation I/O failures stay
/// 500s with enough context for the caller to retry or alert.
pub fn registry_error(err: RegistryError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        RegistryError::UnknownBackground(_) => StatusCode::NOT_FOUND,
        RegistryError::ReadOnly(_) => StatusCode::FORBIDDEN,
        RegistryError::InvalidMetadata(_) => StatusCode::BAD_REQUEST,
        RegistryError::Io(_)
        | RegistryError::Json(_)
        | RegistryError::RootUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.to_string())
}
