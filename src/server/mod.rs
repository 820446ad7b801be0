//! HTTP API
//!
//! axum router over the estimator and the ticket tracker.

mod error;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::ai::{EstimatorClient, SharedMetrics, create_shared_metrics};
use crate::config::{Config, ServerConfig};
use crate::storage::{Database, SharedDatabase};
use crate::tracker::Tracker;
use crate::types::{Result, log_filter_warn};

pub use handlers::{CreateTicketRequest, EstimateRequest, EstimateResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: SharedDatabase,
    pub estimator: EstimatorClient,
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(config: Config, db: SharedDatabase, estimator: EstimatorClient) -> Self {
        let metrics = estimator.metrics().clone();
        Self {
            config: Arc::new(config),
            db,
            estimator,
            metrics,
        }
    }

    pub fn tracker(&self) -> Tracker {
        Tracker::new(self.db.clone())
    }
}

/// Build the router with CORS, tracing, body limit and timeout layers
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);
    let body_limit = state.config.server.max_body_bytes;
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/info", get(handlers::info))
        .route("/api/estimate", post(handlers::estimate))
        .route("/api/create-ticket", post(handlers::create_ticket))
        .route("/api/tickets", get(handlers::list_tickets))
        .route("/api/kanban-tickets", get(handlers::kanban_board))
        .route("/api/kanban-tickets/reset", post(handlers::reset_tickets))
        .route(
            "/api/kanban-tickets/:id",
            patch(handlers::update_kanban_ticket).delete(handlers::delete_kanban_ticket),
        )
        .route("/api/kanban-tickets/:id/detail", get(handlers::ticket_detail))
        .route(
            "/api/ticket/:identifier",
            get(handlers::lookup_ticket).patch(handlers::update_ticket),
        )
        .route("/api/dashboard-stats", get(handlers::dashboard_stats))
        .route("/api/historical-stats", get(handlers::historical_stats))
        .layer(TimeoutLayer::new(timeout))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    if config.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| {
            log_filter_warn(
                origin.parse::<HeaderValue>(),
                &format!("Ignoring invalid CORS origin '{}'", origin),
            )
        })
        .collect();

    layer.allow_origin(origins)
}

/// Open the store, pick the estimator, and serve until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let db = Database::open(&config.database.path)?;
    db.initialize()?;
    info!("Ticket store at {}", config.database.path.display());

    let estimator = EstimatorClient::from_config(&config, create_shared_metrics());
    let address = config.server.bind_addr();
    let app = router(AppState::new(config, Arc::new(db), estimator));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let estimator = EstimatorClient::unavailable(create_shared_metrics());
        router(AppState::new(Config::default(), Arc::new(db), estimator))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn estimate_and_create(app: &Router, task: &str) -> Value {
        let (_, estimate) = send(app, "POST", "/api/estimate", Some(json!({ "task": task }))).await;
        let mut body = estimate["draft"].clone();
        body["edited_priority"] = json!("high");
        let (status, created) = send(app, "POST", "/api/create-ticket", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        created["ticket"].clone()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["estimator"]["available"], false);
    }

    #[tokio::test]
    async fn test_info_lists_endpoints() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/info", None).await;
        assert_eq!(status, StatusCode::OK);
        let endpoints = body["endpoints_available"].as_array().unwrap();
        assert!(endpoints.contains(&json!("POST /api/estimate")));
    }

    #[tokio::test]
    async fn test_estimate_rejects_empty_task() {
        let app = app();
        let (status, body) =
            send(&app, "POST", "/api/estimate", Some(json!({ "task": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Task description is required");

        let (status, _) = send(&app, "POST", "/api/estimate", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_estimate_without_credential_falls_back() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/estimate",
            Some(json!({ "task": "Add a login page with OAuth" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fallback"], true);
        assert_eq!(body["error"], "AI service temporarily unavailable");
        assert_eq!(body["draft"]["task"], "Add a login page with OAuth");
        assert_eq!(body["draft"]["ai_generated"], false);
        assert!(
            body["draft"]["ticket_number"]
                .as_str()
                .unwrap()
                .starts_with("TKT-")
        );
    }

    #[tokio::test]
    async fn test_silent_provider_ends_in_fallback_estimate() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut config = Config::default();
        config.llm.api_key = Some("test-key".to_string());
        config.llm.api_base = format!("http://{}", address);
        config.llm.timeout_secs = 3;
        config.llm.deadline_secs = 1;
        config.server.request_timeout_secs = 2;
        config.validate().unwrap();

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let estimator = EstimatorClient::from_config(&config, create_shared_metrics());
        assert!(estimator.is_available());
        let app = router(AppState::new(config, Arc::new(db), estimator));

        let (status, body) = send(
            &app,
            "POST",
            "/api/estimate",
            Some(json!({ "task": "Add a login page with OAuth" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["fallback"], true);
        assert_eq!(body["error"], "API Error: no response within 1s");
        assert_eq!(body["draft"]["task"], "Add a login page with OAuth");
    }

    #[tokio::test]
    async fn test_create_and_lookup_ticket() {
        let app = app();
        let ticket = estimate_and_create(&app, "Add a login page with OAuth").await;
        assert_eq!(ticket["status"], "new");
        assert_eq!(ticket["priority"], "High");

        let number = ticket["ticket_number"].as_str().unwrap();
        let (status, body) = send(&app, "GET", &format!("/api/ticket/{}", number), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["id"], ticket["id"]);
        assert!(body["suggested_assignee"].is_string());

        let (status, body) = send(&app, "GET", "/api/tickets", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let app = app();
        let ticket = estimate_and_create(&app, "Rotate API keys").await;

        let body = json!({
            "ticket_id": ticket["ticket_id"],
            "task": "Rotate API keys",
        });
        let (status, body) = send(&app, "POST", "/api/create-ticket", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_kanban_update_flow() {
        let app = app();
        let ticket = estimate_and_create(&app, "Migrate billing tables").await;
        let id = ticket["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/kanban-tickets/{}", id),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["progress_percentage"], 10);

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/kanban-tickets/{}", id),
            Some(json!({ "progress_percentage": 150 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["progress_percentage"], 100);

        let (status, body) = send(&app, "GET", "/api/kanban-tickets", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickets"]["in_progress"].as_array().unwrap().len(), 1);

        let (status, body) = send(&app, "POST", "/api/kanban-tickets/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Reset 1 tickets to new status");

        let (status, body) =
            send(&app, "GET", &format!("/api/kanban-tickets/{}/detail", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["status"], "new");
    }

    #[tokio::test]
    async fn test_delete_ticket() {
        let app = app();
        let ticket = estimate_and_create(&app, "Remove the old cron jobs").await;
        let uri = format!("/api/kanban-tickets/{}", ticket["id"]);

        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["id"], ticket["id"]);

        let (status, body) = send(&app, "GET", "/api/tickets", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_invalid_status_and_missing_ticket() {
        let app = app();
        let ticket = estimate_and_create(&app, "Write release notes").await;
        let id = ticket["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/kanban-tickets/{}", id),
            Some(json!({ "status": "done" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, "GET", "/api/kanban-tickets/999/detail", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/api/ticket/TKT-NOPE", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preview_update_reports_old_status() {
        let app = app();
        let ticket = estimate_and_create(&app, "Add audit logging").await;
        let ticket_id = ticket["ticket_id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/ticket/{}", ticket_id),
            Some(json!({ "status": "review", "tags": ["audit"], "progress_percentage": 80 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["old_status"], "new");
        assert_eq!(body["ticket"]["status"], "review");
        assert_eq!(body["ticket"]["tags"], json!(["audit"]));
        assert_eq!(body["ticket"]["progress_percentage"], 0);
        assert_eq!(body["message"], "Ticket updated successfully");

        let (_, body) = send(
            &app,
            "PATCH",
            &format!("/api/ticket/{}", ticket_id),
            Some(json!({ "status": "review" })),
        )
        .await;
        assert_eq!(body["message"], "No changes made");
    }

    #[tokio::test]
    async fn test_stats_endpoints() {
        let app = app();
        estimate_and_create(&app, "Add a status page").await;

        let (status, body) = send(&app, "GET", "/api/dashboard-stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["total_tickets"], 1);
        assert_eq!(body["stats"]["tiles"]["NEW"]["count"], 1);

        let (status, body) = send(&app, "GET", "/api/historical-stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["new_tickets"]["labels"].as_array().unwrap().len(), 6);
        assert_eq!(body["completed_tickets"]["values"].as_array().unwrap().len(), 6);
    }
}
