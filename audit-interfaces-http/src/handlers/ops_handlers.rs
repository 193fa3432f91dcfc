use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tokio::time::{timeout, Duration};
use tracing::error;

use audit_application::AppState;

use crate::middleware::authorize;

#[derive(serde::Serialize)]
struct AlertStatus {
    status: String,
    mode: String,
}

pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

pub async fn health_ready(State(state): State<AppState>) -> StatusCode {
    let timeout_secs = state.config.request_timeout_seconds.max(1);
    let timeout_duration = Duration::from_secs(timeout_secs);
    match timeout(timeout_duration, state.ledger_repo.ping()).await {
        Ok(Ok(_)) => StatusCode::OK,
        Ok(Err(err)) => {
            error!("ready check failed: {}", err);
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(_) => {
            error!("ready check timeout after {}s", timeout_secs);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn alert_target_check(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(AlertStatus {
                status: "unauthorized".to_string(),
                mode: "unset".to_string(),
            }),
        )
            .into_response();
    }

    let timeout_secs = state.config.request_timeout_seconds.max(1);
    let timeout_duration = Duration::from_secs(timeout_secs);
    let mode = if state.config.alert_webhook_url.is_some() {
        "http"
    } else {
        "unset"
    };

    match timeout(
        timeout_duration,
        state.alert_service.check_alert_target(&state.config),
    )
    .await
    {
        Ok(Ok(_)) => (
            StatusCode::OK,
            Json(AlertStatus {
                status: "ok".to_string(),
                mode: mode.to_string(),
            }),
        )
            .into_response(),
        Ok(Err(err)) => {
            error!("alert target check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(AlertStatus {
                    status: "error".to_string(),
                    mode: mode.to_string(),
                }),
            )
                .into_response()
        }
        Err(_) => {
            error!("alert target check timeout after {}s", timeout_secs);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(AlertStatus {
                    status: "timeout".to_string(),
                    mode: mode.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn metrics_prometheus(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string()).into_response();
    }
    let payload = state.metrics.render_prometheus();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    (headers, payload).into_response()
}
