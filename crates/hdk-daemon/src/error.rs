//! Mapping of service errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hdk_domain::ValidationError;
use hdk_kitchen::KitchenError;
use tracing::error;

use crate::api_types::ErrorResponse;

/// Handler error: `NotFound` → 404, `Validation` → 400, `Store` → 503.
#[derive(Debug)]
pub struct ApiError(pub KitchenError);

impl From<KitchenError> for ApiError {
    fn from(e: KitchenError) -> Self {
        Self(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(KitchenError::Validation(e))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            KitchenError::NotFound(_) | KitchenError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            KitchenError::Validation(_) => StatusCode::BAD_REQUEST,
            KitchenError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "order store failure");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
