use std::sync::Arc;

use audit_domain::ports::{AlertService, AnomalyRepository, ConfigRepository, LedgerRepository};
use audit_domain::{AuditThresholds, RuntimeConfig};
use tokio::sync::RwLock;

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub ledger_repo: Arc<dyn LedgerRepository>,
    pub anomaly_repo: Arc<dyn AnomalyRepository>,
    pub config_repo: Arc<dyn ConfigRepository>,
    pub alert_service: Arc<dyn AlertService>,
    pub thresholds: Arc<RwLock<AuditThresholds>>,
    pub metrics: Arc<Metrics>,
}
