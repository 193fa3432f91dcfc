// Runtime configuration entities
// Resolved config handed to the application layer; parsing and env override
// logic lives in the infrastructure crate.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub alert_webhook_url: Option<String>,
    pub alert_webhook_template: Option<String>,
    pub thresholds_path: String,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
}

/// Tunable rule thresholds. Loaded from a YAML file at startup and editable
/// at runtime through the thresholds endpoint; every field falls back to the
/// documented default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditThresholds {
    pub settlement_window_days: i64,
    pub settlement_max_age_days: f64,
    pub refund_window_days: i64,
    pub refund_ratio_high: f64,
    pub refund_ratio_critical: f64,
    pub booking_spike_baseline_days: i64,
    pub booking_spike_multiplier: f64,
    pub payment_window_days: i64,
    pub payment_failure_baseline_days: i64,
    pub payment_failure_multiplier: f64,
    pub margin_window_days: i64,
    pub commission_rate: f64,
    pub margin_alert_floor: f64,
    pub kyc_max_age_days: f64,
    pub ticket_window_days: i64,
    pub ticket_zscore_threshold: f64,
    pub webhook_window_days: i64,
    pub webhook_max_gap_hours: f64,
}

impl Default for AuditThresholds {
    fn default() -> Self {
        Self {
            settlement_window_days: 30,
            settlement_max_age_days: 7.0,
            refund_window_days: 30,
            refund_ratio_high: 0.25,
            refund_ratio_critical: 0.40,
            booking_spike_baseline_days: 7,
            booking_spike_multiplier: 2.5,
            payment_window_days: 14,
            payment_failure_baseline_days: 6,
            payment_failure_multiplier: 2.0,
            margin_window_days: 14,
            commission_rate: 0.10,
            margin_alert_floor: 1000.0,
            kyc_max_age_days: 180.0,
            ticket_window_days: 14,
            ticket_zscore_threshold: 2.5,
            webhook_window_days: 30,
            webhook_max_gap_hours: 24.0,
        }
    }
}

impl AuditThresholds {
    /// Bookings feed the refund-ratio, spike, margin, and ticket-size rules;
    /// read once with the widest window any of them needs.
    pub fn booking_lookback_days(&self) -> i64 {
        self.refund_window_days
            .max(self.margin_window_days)
            .max(self.ticket_window_days)
            // spike needs the full baseline plus today
            .max(self.booking_spike_baseline_days + 1)
    }

    /// Refunds feed the ratio and margin rules.
    pub fn refund_lookback_days(&self) -> i64 {
        self.refund_window_days.max(self.margin_window_days)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("settlement_window_days", self.settlement_window_days),
            ("refund_window_days", self.refund_window_days),
            ("booking_spike_baseline_days", self.booking_spike_baseline_days),
            ("payment_window_days", self.payment_window_days),
            ("payment_failure_baseline_days", self.payment_failure_baseline_days),
            ("margin_window_days", self.margin_window_days),
            ("ticket_window_days", self.ticket_window_days),
            ("webhook_window_days", self.webhook_window_days),
        ] {
            if value <= 0 {
                bail!("{} must be positive, got {}", name, value);
            }
        }
        for (name, value) in [
            ("settlement_max_age_days", self.settlement_max_age_days),
            ("booking_spike_multiplier", self.booking_spike_multiplier),
            ("payment_failure_multiplier", self.payment_failure_multiplier),
            ("kyc_max_age_days", self.kyc_max_age_days),
            ("ticket_zscore_threshold", self.ticket_zscore_threshold),
            ("webhook_max_gap_hours", self.webhook_max_gap_hours),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("{} must be a positive number, got {}", name, value);
            }
        }
        if !(0.0..=1.0).contains(&self.commission_rate) {
            bail!(
                "commission_rate must be within 0..=1, got {}",
                self.commission_rate
            );
        }
        if self.refund_ratio_high <= 0.0 || self.refund_ratio_critical < self.refund_ratio_high {
            bail!(
                "refund ratio thresholds must satisfy 0 < high <= critical, got high={} critical={}",
                self.refund_ratio_high,
                self.refund_ratio_critical
            );
        }
        if self.margin_alert_floor < 0.0 {
            bail!(
                "margin_alert_floor must be non-negative, got {}",
                self.margin_alert_floor
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AuditThresholds::default().validate().expect("defaults valid");
    }

    #[test]
    fn booking_lookback_covers_widest_consumer() {
        let thresholds = AuditThresholds::default();
        // refund ratio divides by bookings over its 30-day window
        assert_eq!(thresholds.booking_lookback_days(), 30);

        let narrow = AuditThresholds {
            refund_window_days: 3,
            margin_window_days: 3,
            ticket_window_days: 3,
            ..AuditThresholds::default()
        };
        // 7-day spike baseline still needs 8 days of records
        assert_eq!(narrow.booking_lookback_days(), 8);
    }

    #[test]
    fn validate_rejects_inverted_refund_ratios() {
        let bad = AuditThresholds {
            refund_ratio_high: 0.5,
            refund_ratio_critical: 0.4,
            ..AuditThresholds::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_windows() {
        let bad = AuditThresholds {
            margin_window_days: 0,
            ..AuditThresholds::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let parsed: AuditThresholds =
            serde_yaml::from_str("refund_ratio_high: 0.3\n").expect("parse partial yaml");
        assert!((parsed.refund_ratio_high - 0.3).abs() < 1e-9);
        assert_eq!(parsed.settlement_window_days, 30);
        assert!((parsed.webhook_max_gap_hours - 24.0).abs() < 1e-9);
    }
}
