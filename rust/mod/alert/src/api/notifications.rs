use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use marches_auth::catalog::{ALERTES_READ, NOTIFICATIONS_READ};
use marches_auth::Principal;
use marches_core::extract;
use marches_core::ServiceError;

use super::AlertState;
use crate::model::NotificationQuery;

pub fn router(state: AlertState) -> Router {
    Router::new()
        .route("/notifications", get(list_notifications))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /notifications
// ---------------------------------------------------------------------------

async fn list_notifications(
    principal: Principal,
    State(state): State<AlertState>,
    extract::Query(query): extract::Query<NotificationQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    principal.require_any(&[NOTIFICATIONS_READ, ALERTES_READ])?;
    let result = state.store.list_notifications(&query)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}
