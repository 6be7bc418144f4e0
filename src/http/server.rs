//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the log API handlers
//! - Guard API routes with the bearer token middleware
//! - Wire up middleware (tracing, request ID, timeout, body limit, metrics)
//! - Serve on a listener until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::http::auth::require_api_token;
use crate::http::handlers::{get_logs, get_stats, upload_logs};
use crate::observability::metrics;
use crate::service::HealthLogService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HealthLogService>,
    pub api_token: Arc<str>,
}

/// HTTP server for the log API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over the given service.
    pub fn new(config: &ServiceConfig, service: Arc<HealthLogService>) -> Self {
        let state = AppState {
            service,
            api_token: Arc::from(config.api.token.as_str()),
        };
        Self {
            router: build_router(config, state),
        }
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ServiceConfig, state: AppState) -> Router {
    Router::new()
        .route("/logs", post(upload_logs).get(get_logs))
        .route("/stats/{type}", get(get_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_token,
        ))
        .with_state(state)
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        LogFilters, LogPage, LogStats, LogStore, NewHealthLog, Pagination, SqliteLogStore,
        StatType, StorageError, StorageResult,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TOKEN: &str = "test-token";

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.api.token = TOKEN.into();
        config
    }

    fn router_over(store: Arc<dyn LogStore>) -> Router {
        HttpServer::new(&config(), Arc::new(HealthLogService::new(store))).router()
    }

    async fn sqlite_router() -> Router {
        router_over(Arc::new(SqliteLogStore::in_memory().await.unwrap()))
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn entry(severity: &str) -> Value {
        json!({
            "timestamp": "2023-01-01T12:00:00Z",
            "source": "test-source",
            "severity": severity,
            "message": "Test message",
            "patient_id": "patient123",
        })
    }

    struct FailingStore(fn() -> StorageError);

    #[async_trait]
    impl LogStore for FailingStore {
        async fn save(&self, _entries: &[NewHealthLog]) -> StorageResult<()> {
            Err((self.0)())
        }

        async fn find_and_count(
            &self,
            _filters: &LogFilters,
            _pagination: Pagination,
        ) -> StorageResult<LogPage> {
            Err((self.0)())
        }

        async fn stats_by_type(&self, _stat: StatType) -> StorageResult<LogStats> {
            Err((self.0)())
        }

        async fn count(&self) -> StorageResult<u64> {
            Err((self.0)())
        }
    }

    fn corrupt() -> StorageError {
        StorageError::Corrupt {
            column: "severity",
            message: "disk on fire".into(),
        }
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable("pool timed out".into())
    }

    #[tokio::test]
    async fn test_upload_then_read_back() {
        let router = sqlite_router().await;

        let (status, body) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [entry("info"), entry("error")] }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "status": "Ok" }));

        let (status, body) = send(&router, request("GET", "/logs", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert!(row["patientId"].is_null());
            assert_eq!(row["timestamp"], "2023-01-01T12:00:00.000Z");
        }
    }

    #[tokio::test]
    async fn test_upload_validation_errors_are_aggregated() {
        let router = sqlite_router().await;
        let mut bad_time = entry("info");
        bad_time["timestamp"] = json!("not-a-date");

        let (status, body) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [entry("fatal"), bad_time] }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(
            body["message"],
            json!([
                "logs.0.severity must be one of the following values: error, warning, info",
                "logs.1.timestamp must be a valid ISO 8601 date string",
            ])
        );

        let (_, body) = send(&router, request("GET", "/logs", None)).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_timestamps_outside_storable_years_rejected() {
        let router = sqlite_router().await;
        let (status, _) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [entry("info")] }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut year_minus_one = entry("error");
        year_minus_one["timestamp"] = json!("0000-01-01T00:00:00+01:00");
        let (status, body) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [year_minus_one] }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            json!(["logs.0.timestamp must be a valid ISO 8601 date string"])
        );

        let (status, body) = send(&router, request("GET", "/logs", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, body) = send(
            &router,
            request("GET", "/logs?after=9999-12-31T23:30:00-01:00", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            json!(["after must be a valid ISO 8601 date string"])
        );
    }

    #[tokio::test]
    async fn test_offset_crossing_year_boundary_orders_and_filters_in_utc() {
        let router = sqlite_router().await;
        let mut new_year_local = entry("info");
        // 2025-12-31T23:30:00Z
        new_year_local["timestamp"] = json!("2026-01-01T00:30:00+01:00");
        let mut late_utc = entry("error");
        late_utc["timestamp"] = json!("2025-12-31T23:45:00Z");
        let (status, _) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [late_utc, new_year_local] }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&router, request("GET", "/logs", None)).await;
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows[0]["timestamp"], "2025-12-31T23:30:00.000Z");
        assert_eq!(rows[1]["timestamp"], "2025-12-31T23:45:00.000Z");

        let (_, body) = send(
            &router,
            request("GET", "/logs?after=2026-01-01T00:40:00%2B01:00", None),
        )
        .await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["rows"][0]["severity"], "error");
    }

    #[tokio::test]
    async fn test_upload_rejects_malformed_and_unknown_fields() {
        let router = sqlite_router().await;

        let (status, body) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [], "extra": true }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);

        let (status, body) = send(&router, request("POST", "/logs", Some(json!({ "logs": [] })))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!(["At least one log entry is required"]));

        let malformed = Request::builder()
            .method("POST")
            .uri("/logs")
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"logs\": ["))
            .unwrap();
        let (status, _) = send(&router, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_params_validated() {
        let router = sqlite_router().await;

        for uri in [
            "/logs?severity=loud",
            "/logs?limit=-1",
            "/logs?offset=abc",
            "/logs?after=yesterday",
            "/logs?page=2",
        ] {
            let (status, body) = send(&router, request("GET", uri, None)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["statusCode"], 400, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_severity_filter_and_pagination() {
        let router = sqlite_router().await;
        let logs: Vec<Value> = ["error", "info", "info", "warning", "error"]
            .into_iter()
            .map(entry)
            .collect();
        let (status, _) = send(&router, request("POST", "/logs", Some(json!({ "logs": logs })))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&router, request("GET", "/logs?severity=error", None)).await;
        assert_eq!(body["count"], 2);
        for row in body["rows"].as_array().unwrap() {
            assert_eq!(row["severity"], "error");
        }

        let (_, body) = send(&router, request("GET", "/logs?limit=2&offset=1", None)).await;
        assert_eq!(body["count"], 5);
        assert_eq!(body["rows"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stats() {
        let router = sqlite_router().await;

        let (status, body) = send(&router, request("GET", "/stats/severity", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        let logs = json!({ "logs": [entry("error"), entry("info"), entry("info")] });
        send(&router, request("POST", "/logs", Some(logs))).await;

        let (_, body) = send(&router, request("GET", "/stats/severity", None)).await;
        assert_eq!(body, json!({ "error": 1, "info": 2 }));

        let (_, body) = send(&router, request("GET", "/stats/source", None)).await;
        assert_eq!(body, json!({ "test-source": 3 }));

        let (status, body) = send(&router, request("GET", "/stats/bogus", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "status": "Failed", "message": "Invalid stat type: bogus" })
        );
    }

    #[tokio::test]
    async fn test_every_route_requires_token() {
        let router = sqlite_router().await;
        let cases = [
            ("POST", "/logs", Some(json!({ "logs": [entry("info")] }))),
            ("GET", "/logs", None),
            ("GET", "/stats/severity", None),
        ];

        for (method, uri, body) in cases {
            for auth in [None, Some("Bearer wrong"), Some("Bearer ")] {
                let mut builder = Request::builder().method(method).uri(uri);
                if let Some(auth) = auth {
                    builder = builder.header(header::AUTHORIZATION, auth);
                }
                let req = match &body {
                    Some(body) => builder
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(body.to_string()))
                        .unwrap(),
                    None => builder.body(Body::empty()).unwrap(),
                };
                let (status, resp) = send(&router, req).await;
                assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri} {auth:?}");
                assert_eq!(resp["statusCode"], 401);
                assert_eq!(resp["error"], "Unauthorized");
                assert_eq!(resp["message"], "Invalid or missing API token");
            }
        }

        let (_, body) = send(&router, request("GET", "/logs", None)).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_without_auth() {
        let router = sqlite_router().await;
        let req = Request::builder()
            .uri("/nowhere")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_id_echoed() {
        let router = sqlite_router().await;
        let response = router
            .oneshot(request("GET", "/logs", None))
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let router = router_over(Arc::new(FailingStore(corrupt)));

        let (status, body) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [entry("info")] }))),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "Failed");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Error uploading logs: "));

        let (status, body) = send(&router, request("GET", "/logs", None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Error retrieving logs: "));

        let (status, body) = send(&router, request("GET", "/stats/source", None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Error retrieving stats: "));
    }

    #[tokio::test]
    async fn test_unavailable_storage_passes_503_through() {
        let router = router_over(Arc::new(FailingStore(unavailable)));

        let (status, body) = send(
            &router,
            request("POST", "/logs", Some(json!({ "logs": [entry("info")] }))),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "Failed");

        let (status, _) = send(&router, request("GET", "/stats/severity", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = config();
        config.security.max_body_size = 64;
        let store = Arc::new(SqliteLogStore::in_memory().await.unwrap());
        let router = HttpServer::new(&config, Arc::new(HealthLogService::new(store))).router();

        let logs: Vec<Value> = (0..10).map(|_| entry("info")).collect();
        let (status, _) = send(&router, request("POST", "/logs", Some(json!({ "logs": logs })))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
