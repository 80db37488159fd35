//! Request Gateway
//!
//! axum router in front of the balance and reporting engines. Handlers
//! decode and validate input, call exactly one engine operation and map
//! its result into the `{code, msg, data}` envelope.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

/// Build the complete router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Balances
        .route("/balance", get(handlers::get_balance).post(handlers::enroll))
        .route("/transfer", post(handlers::transfer))
        // Order lifecycle
        .route("/order", post(handlers::reserve_order))
        .route("/order/success", post(handlers::order_success))
        .route("/order/failed", post(handlers::order_failed))
        // Reports
        .route("/report", post(handlers::create_report))
        .route("/report/csv", get(handlers::report_csv))
        .route("/history", get(handlers::history))
        .with_state(state)
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
}

/// Bind and serve until the listener fails
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!("Failed to bind to {}: {}", addr, e);
        e
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{OrderId, ServiceId, UserId};
    use crate::ledger::MemoryLedgerStore;
    use crate::report::CsvReportDir;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        store: MemoryLedgerStore,
        _reports: tempfile::TempDir,
    }

    fn app() -> TestApp {
        let reports = tempfile::tempdir().unwrap();
        let store = MemoryLedgerStore::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(CsvReportDir::new(reports.path())),
            "http://localhost:8080/",
        );
        TestApp {
            router: router(Arc::new(state)),
            store,
            _reports: reports,
        }
    }

    async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: &TestApp, uri: &str) -> (StatusCode, Value) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let (status, body) = send(app, req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = send(app, req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn order_body(user: UserId, service: ServiceId, order: OrderId, cost: Value) -> Value {
        json!({
            "user_id": user.to_string(),
            "service_id": service.to_string(),
            "service_name": "Widget",
            "order_id": order.to_string(),
            "cost": cost,
        })
    }

    #[tokio::test]
    async fn test_enroll_and_get_balance() {
        let app = app();
        let u1 = UserId::new_random();

        let (status, body) =
            post_json(&app, "/balance", json!({"id": u1.to_string(), "funds": 100})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["balance"], "100.00");

        let (status, body) = get_json(&app, &format!("/balance?id={}", u1)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], u1.to_string());
        assert_eq!(body["data"]["balance"], "100.00");
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let app = app();
        let (status, body) =
            get_json(&app, &format!("/balance?id={}", UserId::new_random())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], types::error_codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_input_is_400_envelope() {
        let app = app();

        let (status, body) = get_json(&app, "/balance?id=nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], types::error_codes::INVALID_PARAMETER);

        let (status, body) = post_json(
            &app,
            "/balance",
            json!({"id": UserId::new_random().to_string(), "funds": ".5"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], types::error_codes::INVALID_PARAMETER);

        let (status, _) = post_json(
            &app,
            "/balance",
            json!({"id": UserId::new_random().to_string(), "funds": 0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            &app,
            "/balance",
            json!({"id": UserId::new_random().to_string(), "funds": "1.001"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = Request::post("/transfer")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["code"], types::error_codes::INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_code() {
        let app = app();
        let (u1, u2) = (UserId::new_random(), UserId::new_random());
        post_json(&app, "/balance", json!({"id": u1.to_string(), "funds": 10})).await;
        post_json(&app, "/balance", json!({"id": u2.to_string(), "funds": 10})).await;

        let (status, body) = post_json(
            &app,
            "/transfer",
            json!({"sender_id": u1.to_string(), "recipient_id": u2.to_string(), "funds": "10.01"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], types::error_codes::INSUFFICIENT_BALANCE);

        let (status, body) = post_json(
            &app,
            "/transfer",
            json!({"sender_id": u1.to_string(), "recipient_id": u2.to_string(), "funds": 4}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);

        let (_, body) = get_json(&app, &format!("/balance?id={}", u2)).await;
        assert_eq!(body["data"]["balance"], "14.00");
    }

    #[tokio::test]
    async fn test_order_lifecycle_over_http() {
        let app = app();
        let u1 = UserId::new_random();
        let (svc, order) = (ServiceId::new_random(), OrderId::new_random());
        post_json(&app, "/balance", json!({"id": u1.to_string(), "funds": 60})).await;

        let (status, _) = post_json(&app, "/order", order_body(u1, svc, order, json!(50))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.store.pending_orders().await.len(), 1);

        // "50.00" and 50 are the same amount
        let (status, body) =
            post_json(&app, "/order/success", order_body(u1, svc, order, json!("50.00"))).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, _) =
            post_json(&app, "/order/success", order_body(u1, svc, order, json!(50))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = get_json(&app, &format!("/balance?id={}", u1)).await;
        assert_eq!(body["data"]["balance"], "10.00");
    }

    #[tokio::test]
    async fn test_order_failed_returns_funds() {
        let app = app();
        let u1 = UserId::new_random();
        let (svc, order) = (ServiceId::new_random(), OrderId::new_random());
        post_json(&app, "/balance", json!({"id": u1.to_string(), "funds": 60})).await;
        post_json(&app, "/order", order_body(u1, svc, order, json!(50))).await;

        let (status, _) =
            post_json(&app, "/order/failed", order_body(u1, svc, order, json!(49))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            post_json(&app, "/order/failed", order_body(u1, svc, order, json!(50))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["balance"], "60.00");
    }

    #[tokio::test]
    async fn test_report_roundtrip() {
        let app = app();
        let u1 = UserId::new_random();
        let (svc, order) = (ServiceId::new_random(), OrderId::new_random());
        post_json(&app, "/balance", json!({"id": u1.to_string(), "funds": 60})).await;
        post_json(&app, "/order", order_body(u1, svc, order, json!(25))).await;
        post_json(&app, "/order/success", order_body(u1, svc, order, json!(25))).await;

        let now = chrono::Utc::now();
        let (year, month) = (chrono::Datelike::year(&now), chrono::Datelike::month(&now));
        let (status, body) = post_json(
            &app,
            "/report",
            json!({"year": year.to_string(), "month": month}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(
            body["data"]["url"],
            format!("http://localhost:8080/report/csv?id={}", id)
        );

        let req = Request::get(format!("/report/csv?id={}", id))
            .body(Body::empty())
            .unwrap();
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(
            resp.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/csv")
        );
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Widget;25.00\n");

        let (status, _) = get_json(&app, &format!("/report/csv?id={}", UserId::new_random())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_report_bad_month() {
        let app = app();
        let (status, body) =
            post_json(&app, "/report", json!({"year": "2022", "month": "13"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], types::error_codes::INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn test_history_endpoint() {
        let app = app();
        let (u1, u2) = (UserId::new_random(), UserId::new_random());
        post_json(&app, "/balance", json!({"id": u1.to_string(), "funds": 100})).await;
        post_json(&app, "/balance", json!({"id": u2.to_string(), "funds": 1})).await;
        post_json(
            &app,
            "/transfer",
            json!({"sender_id": u1.to_string(), "recipient_id": u2.to_string(), "funds": 40}),
        )
        .await;

        let (status, body) =
            get_json(&app, &format!("/history?id={}&limit=10&offset=0", u1)).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["service_name"], "Replenished");
        assert_eq!(rows[0]["amount"], "100.00");
        assert_eq!(rows[1]["service_name"], "Transferred");

        let (status, _) = get_json(&app, &format!("/history?id={}&limit=0&offset=0", u1)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(&app, &format!("/history?id={}&limit=5", u1)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(
            &app,
            &format!("/history?id={}&limit=5&offset=0", UserId::new_random()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_is_get_only() {
        let app = app();
        let u1 = UserId::new_random();
        post_json(&app, "/balance", json!({"id": u1.to_string(), "funds": 1})).await;

        let uri = format!("/history?id={}&limit=10&offset=0", u1);
        let req = Request::post(uri.as_str()).body(Body::empty()).unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let spec = openapi::ApiDoc::openapi();
        let item = spec.paths.paths.get("/history").unwrap();
        assert!(item.get.is_some());
        assert!(item.post.is_none());
    }

    #[tokio::test]
    async fn test_internal_error_is_generic() {
        let app = app();
        app.store.set_fail_commits(true);

        let (status, body) = post_json(
            &app,
            "/balance",
            json!({"id": UserId::new_random().to_string(), "funds": 5}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], types::error_codes::INTERNAL_ERROR);
        assert_eq!(body["msg"], "Internal error");
    }

    #[tokio::test]
    async fn test_health_and_docs() {
        let app = app();
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["store"], "memory");

        let (status, body) = get_json(&app, "/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "Balance Service API");
    }
}
