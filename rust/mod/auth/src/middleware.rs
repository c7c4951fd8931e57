//! JWT authentication middleware.
//!
//! Extracts the token from `Authorization: Bearer <token>`, validates it and
//! stores the resulting [`Principal`] in request extensions. Tokens are
//! issued by the session provider; [`JwtAuth::issue`] exists for tooling
//! and tests.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use marches_core::ServiceError;

use crate::catalog;
use crate::permission::PermissionSet;
use crate::principal::Principal;

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Permission codes granted to the user.
    #[serde(default)]
    pub permissions: PermissionSet,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl From<Claims> for Principal {
    fn from(c: Claims) -> Self {
        Principal {
            sub: c.sub,
            name: c.name,
            permissions: c.permissions,
        }
    }
}

/// HS256 keys shared by the middleware.
pub struct JwtAuth {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Sign a token for `sub` valid for `ttl_secs`.
    pub fn issue(
        &self,
        sub: &str,
        name: &str,
        permissions: PermissionSet,
        ttl_secs: i64,
    ) -> Result<String, ServiceError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            name: name.to_string(),
            permissions,
            iat: now,
            exp: now + ttl_secs,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(format!("sign token: {e}")))
    }

    /// Validate a token and return its principal. Codes outside the
    /// catalog are kept but logged, since they can never match a check.
    pub fn verify(&self, token: &str) -> Result<Principal, ServiceError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {e}")))?;
        let unknown = catalog::unknown_codes(&data.claims.permissions);
        if !unknown.is_empty() {
            warn!(sub = %data.claims.sub, "token grants unknown permission codes: {}", unknown.join(", "));
        }
        Ok(data.claims.into())
    }
}

/// Middleware that requires a valid JWT on every non-public path.
pub async fn auth_middleware(
    State(auth): State<Arc<JwtAuth>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("missing authorization token".into()))?;

    let principal = auth.verify(token)?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Paths served without a token.
fn is_public_path(path: &str) -> bool {
    matches!(path, "/health" | "/version")
}
