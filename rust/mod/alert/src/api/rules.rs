use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use marches_auth::catalog::{ALERTES_MANAGE, ALERTES_READ};
use marches_auth::Principal;
use marches_core::extract;
use marches_core::ServiceError;

use super::AlertState;
use crate::model::{AlertRule, CreateAlertRule, UpdateAlertRule};

pub fn router(state: AlertState) -> Router {
    Router::new()
        .route("/rules", get(list_rules).post(create_rule))
        .route(
            "/rules/{code}",
            get(get_rule).patch(update_rule).delete(delete_rule),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /rules
// ---------------------------------------------------------------------------

async fn list_rules(
    principal: Principal,
    State(state): State<AlertState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    principal.require(ALERTES_READ)?;
    let items = state.store.list_rules()?;
    Ok(Json(serde_json::json!({
        "total": items.len(),
        "items": items,
    })))
}

// ---------------------------------------------------------------------------
// POST /rules
// ---------------------------------------------------------------------------

async fn create_rule(
    principal: Principal,
    State(state): State<AlertState>,
    extract::Json(req): extract::Json<CreateAlertRule>,
) -> Result<(StatusCode, Json<AlertRule>), ServiceError> {
    principal.require(ALERTES_MANAGE)?;
    let rule = state.store.create_rule(req)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

// ---------------------------------------------------------------------------
// GET /rules/{code}
// ---------------------------------------------------------------------------

async fn get_rule(
    principal: Principal,
    State(state): State<AlertState>,
    Path(code): Path<String>,
) -> Result<Json<AlertRule>, ServiceError> {
    principal.require(ALERTES_READ)?;
    Ok(Json(state.store.get_rule(&code)?))
}

// ---------------------------------------------------------------------------
// PATCH /rules/{code}
// ---------------------------------------------------------------------------

async fn update_rule(
    principal: Principal,
    State(state): State<AlertState>,
    Path(code): Path<String>,
    extract::Json(patch): extract::Json<UpdateAlertRule>,
) -> Result<Json<AlertRule>, ServiceError> {
    principal.require(ALERTES_MANAGE)?;
    Ok(Json(state.store.update_rule(&code, patch)?))
}

// ---------------------------------------------------------------------------
// DELETE /rules/{code}
// ---------------------------------------------------------------------------

async fn delete_rule(
    principal: Principal,
    State(state): State<AlertState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    principal.require(ALERTES_MANAGE)?;
    state.store.delete_rule(&code)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
