use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use audit_domain::ports::AlertService;
use audit_domain::{Anomaly, RuntimeConfig};

const DEFAULT_TEMPLATE: &str = r#"{"text":"finance audit: {total} findings\n{lines}"}"#;
const MAX_LINES: usize = 8;

#[derive(Default)]
pub struct DefaultAlertService;

impl DefaultAlertService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertService for DefaultAlertService {
    fn spawn_alerts(&self, config: RuntimeConfig, anomalies: Vec<Anomaly>) {
        let alerts: Vec<Anomaly> = anomalies
            .into_iter()
            .filter(|anomaly| anomaly.severity.is_alertable())
            .collect();
        if alerts.is_empty() || config.alert_webhook_url.is_none() {
            return;
        }
        tokio::spawn(async move {
            if let Err(err) = send_alerts(&config, &alerts).await {
                warn!("alert webhook failed: {}", err);
            }
        });
    }

    async fn check_alert_target(&self, config: &RuntimeConfig) -> Result<()> {
        let url = resolve_alert_url(config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
            .build()?;
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("alert webhook responded {}", response.status());
        }
        Ok(())
    }
}

async fn send_alerts(config: &RuntimeConfig, alerts: &[Anomaly]) -> Result<()> {
    let url = resolve_alert_url(config)?;
    let template = config
        .alert_webhook_template
        .as_deref()
        .unwrap_or(DEFAULT_TEMPLATE);

    let payload = build_payload(alerts, template);
    let client = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
        .build()?;

    client
        .post(&url)
        .header("Content-Type", "application/json")
        .body(payload)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

fn resolve_alert_url(config: &RuntimeConfig) -> Result<String> {
    if let Some(url) = &config.alert_webhook_url {
        if !url.trim().is_empty() {
            return Ok(url.clone());
        }
    }
    anyhow::bail!("alert webhook url not configured")
}

fn build_payload(alerts: &[Anomaly], template: &str) -> String {
    let lines = alerts
        .iter()
        .take(MAX_LINES)
        .map(|anomaly| {
            format!(
                "{} | {} | {}",
                anomaly.severity.as_str(),
                anomaly.kind.code(),
                anomaly.message
            )
        })
        .collect::<Vec<_>>();
    let mut line_text = lines.join("\\n");
    if alerts.len() > MAX_LINES {
        line_text.push_str(&format!("\\n... {} more not shown", alerts.len() - MAX_LINES));
    }
    template
        .replace("{total}", &alerts.len().to_string())
        .replace("{lines}", &line_text)
}
