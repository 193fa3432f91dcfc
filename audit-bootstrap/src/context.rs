use std::sync::Arc;

use anyhow::Result;
use clickhouse::Client;
use tokio::sync::RwLock;
use tracing::warn;

use audit_application::{AppState, Metrics};
use audit_domain::{AuditThresholds, ConfigRepository, LedgerRepository};
use audit_infrastructure::{
    AppConfig, ClickhouseRepo, DefaultAlertService, ThresholdFileRepository,
};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        let runtime_config = config.to_runtime_config();
        let db_config = config.to_db_config();

        let mut clickhouse = Client::default()
            .with_url(&db_config.clickhouse_url)
            .with_database(&db_config.clickhouse_database);
        if let Some(user) = &db_config.clickhouse_user {
            clickhouse = clickhouse.with_user(user);
        }
        if let Some(password) = &db_config.clickhouse_password {
            clickhouse = clickhouse.with_password(password);
        }

        let repo = Arc::new(ClickhouseRepo::new(
            clickhouse,
            db_config.clickhouse_database.clone(),
        ));
        repo.ensure_schema().await?;

        let config_repo = Arc::new(ThresholdFileRepository::new());
        let thresholds = match config_repo
            .load_thresholds(&runtime_config.thresholds_path)
            .await
        {
            Ok(thresholds) => thresholds,
            Err(err) => {
                warn!(
                    "failed to load thresholds from {}: {}; using defaults",
                    runtime_config.thresholds_path, err
                );
                AuditThresholds::default()
            }
        };

        let state = AppState {
            config: runtime_config,
            ledger_repo: repo.clone(),
            anomaly_repo: repo,
            config_repo,
            alert_service: Arc::new(DefaultAlertService::new()),
            thresholds: Arc::new(RwLock::new(thresholds)),
            metrics: Arc::new(Metrics::default()),
        };

        Ok(Self { state })
    }
}
