use audit_domain::AuditThresholds;

use crate::{AppError, AppState};

/// Replaces the live threshold set and writes it back to the thresholds
/// file, so the override survives a restart.
pub async fn update_thresholds(
    state: &AppState,
    incoming: AuditThresholds,
) -> Result<(), AppError> {
    incoming
        .validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    state
        .config_repo
        .save_thresholds(&state.config.thresholds_path, &incoming)
        .await
        .map_err(AppError::Store)?;
    *state.thresholds.write().await = incoming;
    Ok(())
}
