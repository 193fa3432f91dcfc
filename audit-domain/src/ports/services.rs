use async_trait::async_trait;

use crate::entities::{Anomaly, RuntimeConfig};

#[async_trait]
pub trait AlertService: Send + Sync {
    /// Fire-and-forget delivery of high/critical findings to the configured
    /// webhook. Never blocks or fails the audit run.
    fn spawn_alerts(&self, config: RuntimeConfig, anomalies: Vec<Anomaly>);
    async fn check_alert_target(&self, config: &RuntimeConfig) -> anyhow::Result<()>;
}
