use axum::Router;

/// A service module that contributes HTTP routes.
///
/// Each business module (alertes, marches, tresorerie, ...) implements this
/// trait. The server binary collects all modules and nests each router
/// under `/{name}`.
pub trait Module: Send + Sync {
    /// Module name, used for logging and as the route prefix.
    fn name(&self) -> &str;

    /// The module's routes. State is already bound.
    fn routes(&self) -> Router;
}
