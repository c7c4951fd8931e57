use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use marches_core::ServiceError;

use crate::permission::PermissionSet;

/// The authenticated actor of a request.
///
/// Placed in request extensions by [`crate::middleware::auth_middleware`];
/// handlers take it as an extractor and gate on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// User id.
    pub sub: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl Principal {
    pub fn new(sub: impl Into<String>, permissions: PermissionSet) -> Self {
        let sub = sub.into();
        Self {
            name: sub.clone(),
            sub,
            permissions,
        }
    }

    pub fn can(&self, code: &str) -> bool {
        self.permissions.has(code)
    }

    pub fn require(&self, code: &str) -> Result<(), ServiceError> {
        if self.permissions.has(code) {
            Ok(())
        } else {
            Err(self.denied(code))
        }
    }

    pub fn require_any(&self, codes: &[&str]) -> Result<(), ServiceError> {
        if self.permissions.has_any(codes) {
            Ok(())
        } else {
            Err(self.denied(&format!("one of [{}]", codes.join(", "))))
        }
    }

    pub fn require_all(&self, codes: &[&str]) -> Result<(), ServiceError> {
        if self.permissions.has_all(codes) {
            Ok(())
        } else {
            Err(self.denied(&format!("all of [{}]", codes.join(", "))))
        }
    }

    fn denied(&self, what: &str) -> ServiceError {
        tracing::debug!(sub = %self.sub, "permission denied: requires {what}");
        ServiceError::PermissionDenied(format!("permission denied: requires {what}"))
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("missing authorization token".into()))
    }
}
