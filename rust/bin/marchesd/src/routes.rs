//! Route registration: system endpoints plus every module under `/{name}`.

use std::sync::Arc;

use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use marches_auth::{auth_middleware, JwtAuth};
use marches_core::Module;

/// Build the complete router. Everything but `/health` and `/version`
/// requires a bearer token.
pub fn build_router(jwt: Arc<JwtAuth>, modules: &[&dyn Module]) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for module in modules {
        app = app.nest(&format!("/{}", module.name()), module.routes());
    }

    app.layer(middleware::from_fn_with_state(jwt, auth_middleware))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "marchesd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use marches_alert::{AlertModule, QueueConfig};
    use marches_auth::PermissionSet;
    use marches_sql::SqliteStore;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<JwtAuth>, AlertModule) {
        let jwt = Arc::new(JwtAuth::new("test-secret"));
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        let module = AlertModule::new(db, QueueConfig::default()).unwrap();
        let router = build_router(jwt.clone(), &[&module]);
        (router, jwt, module)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("authorization", format!("Bearer {t}"));
        }
        match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn system_endpoints_are_public() {
        let (router, _, _) = app();
        for uri in ["/health", "/version"] {
            let resp = router.clone().oneshot(request("GET", uri, None, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn module_routes_require_a_token() {
        let (router, _, _) = app();
        let resp = router
            .oneshot(request("GET", "/alertes/rules", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_permissions_gate_enqueue() {
        let (router, jwt, module) = app();
        let body = r#"{"eventCode":"MARCHE_CREATED","alerteCode":"notif-marche"}"#;

        let reader = jwt
            .issue("u1", "Lecteur", ["alertes.read"].into_iter().collect::<PermissionSet>(), 60)
            .unwrap();
        let resp = router
            .clone()
            .oneshot(request("POST", "/alertes/jobs", Some(&reader), Some(body)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let admin = jwt
            .issue("root", "Admin", ["*"].into_iter().collect::<PermissionSet>(), 60)
            .unwrap();
        let resp = router
            .oneshot(request("POST", "/alertes/jobs", Some(&admin), Some(body)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(module.queue().counts().unwrap().waiting, 1);
    }
}
