// Audit engine
// Runs the detector registry over one snapshot and assembles the report.

use crate::entities::{AuditReport, AuditThresholds};
use crate::services::aggregate::{AuditIndex, AuditSnapshot};
use crate::services::detectors::DETECTORS;

/// Pure compute phase of an audit run: index the snapshot once, evaluate
/// every detector against it, merge the findings. Persistence and alerting
/// are the caller's concern.
pub fn run_audit_checks(snapshot: &AuditSnapshot, thresholds: &AuditThresholds) -> AuditReport {
    let index = AuditIndex::build(snapshot);
    let mut anomalies = Vec::new();
    for detector in DETECTORS {
        anomalies.extend(detector(snapshot, &index, thresholds));
    }
    AuditReport::from_anomalies(anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        BankDetails, Booking, KycRecord, Partner, Refund, Settlement, WebhookEvent,
    };
    use crate::value_objects::{KycStatus, SettlementStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap()
    }

    fn mixed_snapshot() -> AuditSnapshot {
        let now = run_time();
        let mut bookings = Vec::new();
        for n in 0..10 {
            bookings.push(Booking {
                id: format!("b{n}"),
                partner_id: "ptr_refundy".to_string(),
                amount: 250.0,
                status: "confirmed".to_string(),
                created_at: now - Duration::days(5),
            });
        }
        let refunds = (0..3)
            .map(|n| Refund {
                id: format!("r{n}"),
                partner_id: "ptr_refundy".to_string(),
                amount: 250.0,
                created_at: now - Duration::days(4),
            })
            .collect();
        let settlements = vec![Settlement {
            id: "stl_1".to_string(),
            partner_id: "ptr_slow".to_string(),
            amount: 9_000.0,
            status: SettlementStatus::Pending,
            created_at: now - Duration::days(9),
        }];
        let partners = vec![Partner {
            id: "ptr_refundy".to_string(),
            kyc: KycRecord {
                tax_id: Some("TAX-1".to_string()),
                national_id: None,
                status: KycStatus::Approved,
                updated_at: Some(now - Duration::days(10)),
            },
            bank: BankDetails {
                account_number: Some("ACC-1".to_string()),
                routing_code: Some("RTG-1".to_string()),
            },
        }];
        let webhook_events = vec![WebhookEvent {
            id: "wh_1".to_string(),
            created_at: now - Duration::hours(2),
        }];
        AuditSnapshot {
            now,
            bookings,
            payments: Vec::new(),
            refunds,
            settlements,
            partners,
            webhook_events,
        }
    }

    #[test]
    fn report_merges_detector_outputs_with_summary() {
        let report = run_audit_checks(&mixed_snapshot(), &AuditThresholds::default());
        assert_eq!(report.summary.get("HIGH_REFUND_RATIO"), Some(&1));
        assert_eq!(report.summary.get("DELAYED_SETTLEMENT"), Some(&1));
        assert_eq!(report.anomalies.len() as u64, report.summary.values().sum::<u64>());
        // quiet detectors leave no summary entry
        assert!(report.summary.get("BOOKING_SPIKE").is_none());
        assert!(report.summary.get("WEBHOOK_GAP").is_none());
    }

    #[test]
    fn rerun_over_unchanged_data_is_identical() {
        let snapshot = mixed_snapshot();
        let thresholds = AuditThresholds::default();
        let first = run_audit_checks(&snapshot, &thresholds);
        let second = run_audit_checks(&snapshot, &thresholds);
        assert_eq!(first.anomalies, second.anomalies);
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn empty_snapshot_reports_only_webhook_silence() {
        let snapshot = AuditSnapshot {
            now: run_time(),
            bookings: Vec::new(),
            payments: Vec::new(),
            refunds: Vec::new(),
            settlements: Vec::new(),
            partners: Vec::new(),
            webhook_events: Vec::new(),
        };
        let report = run_audit_checks(&snapshot, &AuditThresholds::default());
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].id, "webhook_gap:none");
        assert_eq!(report.summary.get("WEBHOOK_GAP"), Some(&1));
    }
}
