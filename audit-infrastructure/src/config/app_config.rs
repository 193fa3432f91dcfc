use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use audit_domain::{DbConfig, RuntimeConfig};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub alert_webhook_url: Option<String>,
    pub alert_webhook_template: Option<String>,
    pub thresholds_path: String,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            clickhouse_url: "http://127.0.0.1:8123".to_string(),
            clickhouse_database: "finsentry".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
            alert_webhook_url: None,
            alert_webhook_template: None,
            thresholds_path: "./thresholds.yaml".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("FINSENTRY_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        if !file_path.exists() {
            warn!("config.toml not found, using defaults");
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config.resolve_paths(base_dir);
            config.normalize();
            config.validate()?;
            return Ok(config);
        }
        let content = fs::read_to_string(file_path).await?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        if let Some(api_token) = &self.api_token {
            if api_token.trim().is_empty() {
                self.api_token = None;
            }
        }
        if let Some(user) = &self.clickhouse_user {
            if user.trim().is_empty() {
                self.clickhouse_user = None;
            }
        }
        if let Some(password) = &self.clickhouse_password {
            if password.trim().is_empty() {
                self.clickhouse_password = None;
            }
        }
        if let Some(alert_url) = &self.alert_webhook_url {
            if alert_url.trim().is_empty() {
                self.alert_webhook_url = None;
            }
        }
        if let Some(template) = &self.alert_webhook_template {
            if template.trim().is_empty() {
                self.alert_webhook_template = None;
            }
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.thresholds_path = resolve_path(base, &self.thresholds_path);
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }
        if let Some(url) = &self.alert_webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow!("alert_webhook_url must be http(s), got '{}'", url));
            }
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            alert_webhook_url: self.alert_webhook_url.clone(),
            alert_webhook_template: self.alert_webhook_template.clone(),
            thresholds_path: self.thresholds_path.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            clickhouse_url: self.clickhouse_url.clone(),
            clickhouse_database: self.clickhouse_database.clone(),
            clickhouse_user: self.clickhouse_user.clone(),
            clickhouse_password: self.clickhouse_password.clone(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("FINSENTRY_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("FINSENTRY_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("FINSENTRY_CLICKHOUSE_URL") {
            self.clickhouse_url = value;
        }
        if let Ok(value) = env::var("FINSENTRY_CLICKHOUSE_DATABASE") {
            self.clickhouse_database = value;
        }
        if let Ok(value) = env::var("FINSENTRY_CLICKHOUSE_USER") {
            self.clickhouse_user = Some(value);
        }
        if let Ok(value) = env::var("FINSENTRY_CLICKHOUSE_PASSWORD") {
            self.clickhouse_password = Some(value);
        }
        if let Ok(value) = env::var("FINSENTRY_ALERT_WEBHOOK_URL") {
            self.alert_webhook_url = Some(value);
        }
        if let Ok(value) = env::var("FINSENTRY_ALERT_WEBHOOK_TEMPLATE") {
            self.alert_webhook_template = Some(value);
        }
        if let Ok(value) = env::var("FINSENTRY_THRESHOLDS_PATH") {
            self.thresholds_path = value;
        }
        if let Ok(value) = env::var("FINSENTRY_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("FINSENTRY_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
