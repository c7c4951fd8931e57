//! Authorization for the marches dashboard.
//!
//! - [`permission`]: pure `has` / `has_any` / `has_all` evaluation with the
//!   `"*"` wildcard.
//! - [`catalog`]: the permission codes the application defines.
//! - [`principal`]: the authenticated actor, usable as an axum extractor.
//! - [`middleware`]: JWT validation that installs the principal.

pub mod catalog;
pub mod middleware;
pub mod permission;
pub mod principal;

pub use middleware::{auth_middleware, Claims, JwtAuth};
pub use permission::{has, has_all, has_any, PermissionSet, WILDCARD};
pub use principal::Principal;
