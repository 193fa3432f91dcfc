use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::error;

use audit_application::commands::{audit_commands, threshold_commands};
use audit_application::queries::{anomaly_queries, threshold_queries};
use audit_application::AppState;
use audit_domain::{AnomalyQuery, AnomalyRecord, AuditRunRequest, AuditThresholds};

use crate::error::HttpError;
use crate::middleware::authorize;

#[derive(serde::Serialize)]
struct RunFailure {
    success: bool,
    error: String,
}

pub async fn run_audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<AuditRunRequest>>,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return HttpError::Unauthorized.into_response();
    }
    let request = body.map(|Json(request)| request).unwrap_or_default();
    match audit_commands::run_audit(&state, request).await {
        Ok(response) => Json(response).into_response(),
        // no record contents in the failure body, only the proximate error
        Err(err) => {
            error!("audit run failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RunFailure {
                    success: false,
                    error: format!("audit run failed: {}", err),
                }),
            )
                .into_response()
        }
    }
}

pub async fn list_anomalies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AnomalyQuery>,
) -> Result<Json<Vec<AnomalyRecord>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let records = anomaly_queries::list_anomalies(&state, query).await?;
    Ok(Json(records))
}

pub async fn get_thresholds(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuditThresholds>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let thresholds = threshold_queries::get_thresholds(&state).await;
    Ok(Json(thresholds))
}

pub async fn update_thresholds(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AuditThresholds>,
) -> Result<StatusCode, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    threshold_commands::update_thresholds(&state, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
