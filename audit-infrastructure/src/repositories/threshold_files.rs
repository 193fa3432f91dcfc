use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use audit_domain::{AuditThresholds, ConfigRepository};

/// YAML-file store for the threshold set. Absent file means defaults; a
/// partial file fills the missing fields with defaults through serde.
pub struct ThresholdFileRepository;

impl ThresholdFileRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ThresholdFileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigRepository for ThresholdFileRepository {
    async fn load_thresholds(&self, path: &str) -> anyhow::Result<AuditThresholds> {
        if !Path::new(path).exists() {
            return Ok(AuditThresholds::default());
        }
        let content = fs::read_to_string(path).await?;
        let thresholds: AuditThresholds = serde_yaml::from_str(&content)?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    async fn save_thresholds(&self, path: &str, thresholds: &AuditThresholds) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_yaml::to_string(thresholds)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> String {
        std::env::temp_dir()
            .join(format!("finsentry-thresholds-{}.yaml", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .to_string()
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let repo = ThresholdFileRepository::new();
        let loaded = repo
            .load_thresholds(&temp_path())
            .await
            .expect("defaults on missing file");
        assert_eq!(loaded, AuditThresholds::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let repo = ThresholdFileRepository::new();
        let path = temp_path();
        let thresholds = AuditThresholds {
            refund_ratio_high: 0.2,
            webhook_max_gap_hours: 12.0,
            ..AuditThresholds::default()
        };
        repo.save_thresholds(&path, &thresholds).await.expect("save");
        let loaded = repo.load_thresholds(&path).await.expect("load");
        assert_eq!(loaded, thresholds);
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn invalid_file_is_rejected() {
        let repo = ThresholdFileRepository::new();
        let path = temp_path();
        fs::write(&path, "margin_window_days: 0\n").await.expect("write");
        assert!(repo.load_thresholds(&path).await.is_err());
        let _ = fs::remove_file(&path).await;
    }
}
