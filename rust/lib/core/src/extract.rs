//! Request extractors whose rejections use the service error body.
//!
//! axum's own `Json` and `Query` reject malformed input with a plain-text
//! 400/415/422. These wrappers turn the same failures into
//! [`ServiceError::Validation`] so every error is `{code, message}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ServiceError;

/// JSON request body; decoding failures are `VALIDATION_FAILED`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct Json<T>(pub T);

/// Query string; decoding failures are `VALIDATION_FAILED`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct Query<T>(pub T);

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}
