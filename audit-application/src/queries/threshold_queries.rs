use audit_domain::AuditThresholds;

use crate::AppState;

pub async fn get_thresholds(state: &AppState) -> AuditThresholds {
    state.thresholds.read().await.clone()
}
