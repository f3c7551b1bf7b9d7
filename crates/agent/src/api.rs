//! HTTP API for health checks, Prometheus metrics and fleet status

use fleet_lib::{
    health::{ComponentStatus, HealthRegistry},
    history::DecisionLog,
    observability::FleetMetrics,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: FleetMetrics,
    pub decisions: Arc<RwLock<DecisionLog>>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: FleetMetrics,
        decisions: Arc<RwLock<DecisionLog>>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            decisions,
        }
    }
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Latest decision, score and cost trend
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.decisions.read().await.status();
    Json(status)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(status))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use fleet_lib::health::components;
    use fleet_lib::{ExecutionResult, ScaleAction};
    use tower::ServiceExt;

    async fn setup_test_app() -> (Router, Arc<AppState>) {
        let health_registry = HealthRegistry::new();
        health_registry.register_all().await;

        let metrics = FleetMetrics::new();
        let decisions = Arc::new(RwLock::new(DecisionLog::default()));
        let state = Arc::new(AppState::new(health_registry, metrics, decisions));
        (create_router(state.clone()), state)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_healthz_healthy() {
        let (app, _) = setup_test_app().await;
        let (status, body) = get(app, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["components"]["sampler"]["status"], "healthy");
        assert!(body["last_tick_at"].is_null());
    }

    #[tokio::test]
    async fn test_healthz_degraded_still_ok() {
        let (app, state) = setup_test_app().await;
        state
            .health_registry
            .set_degraded(components::SAMPLER, "slow procfs")
            .await;

        let (status, body) = get(app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn test_healthz_unhealthy() {
        let (app, state) = setup_test_app().await;
        let result = ExecutionResult::failed(ScaleAction::ScaleUp, "backend unreachable");
        for _ in 0..3 {
            state
                .health_registry
                .record_tick(chrono::Utc::now(), &result)
                .await;
        }

        let (status, body) = get(app, "/healthz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["consecutive_failures"], 3);
        assert_eq!(body["components"][components::EXECUTOR]["status"], "unhealthy");
        assert_eq!(body["last_failure"]["message"], "backend unreachable");
    }

    #[tokio::test]
    async fn test_readyz_transitions() {
        let (app, state) = setup_test_app().await;
        let (status, body) = get(app.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);

        state.health_registry.set_ready(true).await;
        let (status, body) = get(app.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["reason"].as_str().unwrap().contains("tick"));

        let result = ExecutionResult::succeeded(ScaleAction::Maintain, "No changes needed");
        state
            .health_registry
            .record_tick(chrono::Utc::now(), &result)
            .await;
        let (status, body) = get(app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, state) = setup_test_app().await;
        state.metrics.inc_recommendation("maintain");

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("fleet_optimizer_recommendations_total"));
    }

    #[tokio::test]
    async fn test_status_empty_log() {
        let (app, _) = setup_test_app().await;
        let (status, body) = get(app, "/api/v1/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decisions"], 0);
        assert!(body["latest_recommendation"].is_null());
        assert_eq!(body["cost_trend"]["trend"], "stable");
    }
}
