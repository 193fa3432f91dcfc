// Anomaly entities
// Detector output, the persisted record shape, and audit run DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{AnomalyKind, Severity};

/// Finding produced by a detector, prior to persistence. `id` is a pure
/// function of (kind, key) so repeated runs upsert instead of duplicating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub meta: Value,
}

impl Anomaly {
    pub fn new(
        kind: AnomalyKind,
        key: &str,
        severity: Severity,
        message: String,
        partner_id: Option<String>,
        meta: Value,
    ) -> Self {
        Self {
            id: deterministic_id(kind, key),
            kind,
            severity,
            message,
            partner_id,
            meta,
        }
    }
}

/// `{kind_code_lowercase}:{key}`, e.g. `delayed_settlement:stl_1842`.
pub fn deterministic_id(kind: AnomalyKind, key: &str) -> String {
    format!("{}:{}", kind.code().to_ascii_lowercase(), key)
}

/// An anomaly as persisted: candidate fields plus the write timestamp the
/// store assigned on the most recent upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub meta: Value,
    pub detected_at: DateTime<Utc>,
}

/// Merged detector output: the flat anomaly list plus a kind-code -> count
/// summary. Kinds with zero findings are omitted from the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub anomalies: Vec<Anomaly>,
    pub summary: BTreeMap<String, u64>,
}

impl AuditReport {
    pub fn from_anomalies(anomalies: Vec<Anomaly>) -> Self {
        let mut summary = BTreeMap::new();
        for anomaly in &anomalies {
            *summary.entry(anomaly.kind.code().to_string()).or_insert(0u64) += 1;
        }
        Self { anomalies, summary }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditRunRequest {
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default = "default_persist")]
    pub persist: bool,
}

impl Default for AuditRunRequest {
    fn default() -> Self {
        Self {
            partner_id: None,
            persist: true,
        }
    }
}

fn default_persist() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditRunResponse {
    pub success: bool,
    pub anomalies: Vec<Anomaly>,
    pub summary: BTreeMap<String, u64>,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

impl AuditRunResponse {
    pub fn from_report(report: AuditReport, persisted: bool, persist_error: Option<String>) -> Self {
        Self {
            success: true,
            anomalies: report.anomalies,
            summary: report.summary,
            persisted,
            persist_error,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnomalyQuery {
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deterministic_id_lowercases_kind_code() {
        assert_eq!(
            deterministic_id(AnomalyKind::DelayedSettlement, "stl_1842"),
            "delayed_settlement:stl_1842"
        );
        assert_eq!(
            deterministic_id(AnomalyKind::WebhookGap, "none"),
            "webhook_gap:none"
        );
    }

    #[test]
    fn same_kind_and_key_yield_identical_anomalies() {
        let build = || {
            Anomaly::new(
                AnomalyKind::MissingBankDetails,
                "ptr_7",
                Severity::Medium,
                "partner ptr_7 has no bank details on file".to_string(),
                Some("ptr_7".to_string()),
                json!({"missing": ["account_number"]}),
            )
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn report_summary_counts_by_kind_and_omits_zero_kinds() {
        let anomalies = vec![
            Anomaly::new(
                AnomalyKind::StaleKyc,
                "ptr_1",
                Severity::Low,
                "stale".to_string(),
                Some("ptr_1".to_string()),
                json!({}),
            ),
            Anomaly::new(
                AnomalyKind::StaleKyc,
                "ptr_2",
                Severity::Low,
                "stale".to_string(),
                Some("ptr_2".to_string()),
                json!({}),
            ),
            Anomaly::new(
                AnomalyKind::WebhookGap,
                "none",
                Severity::High,
                "gap".to_string(),
                None,
                json!({}),
            ),
        ];
        let report = AuditReport::from_anomalies(anomalies);
        assert_eq!(report.summary.get("STALE_KYC"), Some(&2));
        assert_eq!(report.summary.get("WEBHOOK_GAP"), Some(&1));
        assert_eq!(report.summary.len(), 2);
    }

    #[test]
    fn run_request_defaults_to_persisting() {
        let parsed: AuditRunRequest = serde_json::from_str("{}").expect("parse empty body");
        assert!(parsed.persist);
        assert!(parsed.partner_id.is_none());

        let parsed: AuditRunRequest =
            serde_json::from_str(r#"{"partner_id":"ptr_9","persist":false}"#).expect("parse body");
        assert!(!parsed.persist);
        assert_eq!(parsed.partner_id.as_deref(), Some("ptr_9"));
    }

    #[test]
    fn anomaly_serializes_kind_under_type_field() {
        let anomaly = Anomaly::new(
            AnomalyKind::BookingSpike,
            "ptr_3:2026-08-23",
            Severity::Medium,
            "spike".to_string(),
            Some("ptr_3".to_string()),
            json!({"today": 25}),
        );
        let value = serde_json::to_value(&anomaly).expect("serialize");
        assert_eq!(value["type"], "BOOKING_SPIKE");
        assert_eq!(value["id"], "booking_spike:ptr_3:2026-08-23");
        assert_eq!(value["severity"], "medium");
    }
}
