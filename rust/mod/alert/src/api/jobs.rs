use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use marches_auth::catalog::{ALERTES_MANAGE, ALERTES_READ, ALERTES_TRIGGER};
use marches_auth::Principal;
use marches_core::extract;
use marches_core::ServiceError;

use super::AlertState;
use crate::model::{AlertJob, AlertJobPayload, JobHandle, JobListQuery};

pub fn router(state: AlertState) -> Router {
    Router::new()
        .route("/jobs", post(enqueue).get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/@retry", post(retry_job))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// POST /jobs
// ---------------------------------------------------------------------------

async fn enqueue(
    principal: Principal,
    State(state): State<AlertState>,
    extract::Json(payload): extract::Json<AlertJobPayload>,
) -> Result<(StatusCode, Json<JobHandle>), ServiceError> {
    principal.require(ALERTES_TRIGGER)?;
    let handle = state.queue.enqueue_alert(payload)?;
    Ok((StatusCode::ACCEPTED, Json(handle)))
}

// ---------------------------------------------------------------------------
// GET /jobs
// ---------------------------------------------------------------------------

async fn list_jobs(
    principal: Principal,
    State(state): State<AlertState>,
    extract::Query(query): extract::Query<JobListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    principal.require(ALERTES_READ)?;
    let result = state.queue.list(&query)?;
    let counts = state.queue.counts()?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
        "counts": counts,
    })))
}

// ---------------------------------------------------------------------------
// GET /jobs/{id}
// ---------------------------------------------------------------------------

async fn get_job(
    principal: Principal,
    State(state): State<AlertState>,
    Path(id): Path<String>,
) -> Result<Json<AlertJob>, ServiceError> {
    principal.require(ALERTES_READ)?;
    Ok(Json(state.queue.get(&id)?))
}

// ---------------------------------------------------------------------------
// POST /jobs/{id}/@retry
// ---------------------------------------------------------------------------

async fn retry_job(
    principal: Principal,
    State(state): State<AlertState>,
    Path(id): Path<String>,
) -> Result<Json<AlertJob>, ServiceError> {
    principal.require(ALERTES_MANAGE)?;
    Ok(Json(state.queue.retry(&id)?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::testing::{app_as, call, state};
    use crate::model::{AlertJobPayload, JobStatus};

    #[tokio::test]
    async fn trigger_enqueues_and_returns_accepted() {
        let st = state();
        let (status, handle) = call(
            app_as(&st, &["alertes.trigger"]),
            "POST",
            "/jobs",
            Some(json!({
                "eventCode": "MARCHE_CREATED",
                "alerteCode": "notif-marche",
                "context": {"marcheId": "m1", "montant": 125000}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(handle["queue"], "alertes");

        let id = handle["id"].as_str().unwrap();
        let job = st.queue.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.payload.event_code, "MARCHE_CREATED");
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_without_a_job() {
        let st = state();
        let (status, err) = call(
            app_as(&st, &["alertes.trigger"]),
            "POST",
            "/jobs",
            Some(json!({"eventCode": " ", "alerteCode": "notif-marche"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "VALIDATION_FAILED");
        assert_eq!(st.queue.counts().unwrap().waiting, 0);
    }

    #[tokio::test]
    async fn undecodable_payloads_are_validation_errors() {
        let st = state();
        let trigger = &["alertes.trigger"];

        let (status, err) = call(
            app_as(&st, trigger),
            "POST",
            "/jobs",
            Some(json!({"alerteCode": "notif-marche"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "VALIDATION_FAILED");
        assert!(err["message"].as_str().unwrap().contains("eventCode"));

        // Context values are scalars only.
        let (status, err) = call(
            app_as(&st, trigger),
            "POST",
            "/jobs",
            Some(json!({
                "eventCode": "MARCHE_CREATED",
                "alerteCode": "notif-marche",
                "context": {"marche": {"id": 1}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "VALIDATION_FAILED");

        let (status, err) = call(app_as(&st, &["alertes.read"]), "GET", "/jobs?status=lost", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "VALIDATION_FAILED");

        assert_eq!(st.queue.counts().unwrap().waiting, 0);
    }

    #[tokio::test]
    async fn reader_cannot_trigger() {
        let st = state();
        let (status, _) = call(
            app_as(&st, &["alertes.read"]),
            "POST",
            "/jobs",
            Some(json!({"eventCode": "E", "alerteCode": "a"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn closed_queue_is_unavailable() {
        let st = state();
        st.queue.close();
        let (status, err) = call(
            app_as(&st, &["*"]),
            "POST",
            "/jobs",
            Some(json!({"eventCode": "E", "alerteCode": "a"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err["code"], "UNAVAILABLE");
    }

    #[tokio::test]
    async fn list_get_and_retry() {
        let st = state();
        let handle = st
            .queue
            .enqueue_alert(AlertJobPayload::new("E", "notif-marche"))
            .unwrap();
        for _ in 0..st.queue.config().max_attempts {
            let job = st.queue.claim_next("w").unwrap().unwrap();
            st.queue.fail(&job.id, "boom").unwrap();
        }

        let reader = &["alertes.read"];
        let (status, list) = call(app_as(&st, reader), "GET", "/jobs?status=failed", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 1);
        assert_eq!(list["counts"]["failed"], 1);

        let uri = format!("/jobs/{}", handle.id);
        let (status, job) = call(app_as(&st, reader), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["status"], "failed");
        assert_eq!(job["error"], "boom");

        let retry = format!("/jobs/{}/@retry", handle.id);
        let (status, _) = call(app_as(&st, reader), "POST", &retry, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, job) = call(app_as(&st, &["alertes.manage"]), "POST", &retry, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["status"], "waiting");
        assert_eq!(job["attempts"], 0);

        // Only failed jobs can be re-driven.
        let (status, _) = call(app_as(&st, &["alertes.manage"]), "POST", &retry, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(app_as(&st, reader), "GET", "/jobs/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
