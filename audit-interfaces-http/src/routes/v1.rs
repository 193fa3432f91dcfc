use axum::Router;

use audit_application::AppState;

use crate::handlers::{audit_handlers, ops_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/audit/run",
            axum::routing::post(audit_handlers::run_audit),
        )
        .route(
            "/v1/audit/anomalies",
            axum::routing::get(audit_handlers::list_anomalies),
        )
        .route(
            "/v1/audit/thresholds",
            axum::routing::get(audit_handlers::get_thresholds)
                .put(audit_handlers::update_thresholds),
        )
        .route(
            "/v1/ops/alert-target/check",
            axum::routing::get(ops_handlers::alert_target_check),
        )
        .route(
            "/v1/ops/health/live",
            axum::routing::get(ops_handlers::health_live),
        )
        .route(
            "/v1/ops/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/v1/ops/metrics/prometheus",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
