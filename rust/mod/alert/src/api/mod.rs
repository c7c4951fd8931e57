mod jobs;
mod notifications;
mod rules;

use std::sync::Arc;

use axum::Router;

use crate::queue::AlertQueue;
use crate::store::AlertStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AlertState {
    pub store: Arc<AlertStore>,
    pub queue: Arc<AlertQueue>,
}

/// Build the complete alert module router.
///
/// Routes:
/// - `GET    /rules`: list rules
/// - `POST   /rules`: create rule
/// - `GET    /rules/{code}`: get rule
/// - `PATCH  /rules/{code}`: update rule
/// - `DELETE /rules/{code}`: delete rule
/// - `POST   /jobs`: enqueue an alert (202)
/// - `GET    /jobs`: list jobs with per-status counts
/// - `GET    /jobs/{id}`: get job
/// - `POST   /jobs/{id}/@retry`: re-drive a failed job
/// - `GET    /notifications`: delivery history
///
/// Every route requires a [`marches_auth::Principal`].
pub fn router(state: AlertState) -> Router {
    Router::new()
        .merge(rules::router(state.clone()))
        .merge(jobs::router(state.clone()))
        .merge(notifications::router(state))
}
