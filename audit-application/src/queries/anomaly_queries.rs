use tracing::error;

use audit_domain::{AnomalyQuery, AnomalyRecord};

use crate::{AppError, AppState};

pub async fn list_anomalies(
    state: &AppState,
    query: AnomalyQuery,
) -> Result<Vec<AnomalyRecord>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let records = state
        .anomaly_repo
        .fetch_anomalies(query.severity, query.partner_id.as_deref(), limit)
        .await
        .map_err(|err| {
            error!("failed to fetch anomalies: {}", err);
            AppError::Store(err)
        })?;
    Ok(records)
}
