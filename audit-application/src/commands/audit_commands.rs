use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use audit_domain::services::run_audit_checks;
use audit_domain::{AuditRunRequest, AuditRunResponse, AuditSnapshot};

use crate::{AppError, AppState};

/// One full audit run: six windowed reads issued concurrently, one pure
/// compute pass, then the optional persist and alert steps. A read failure
/// aborts the run; a persist failure keeps the computed report and is
/// surfaced on the response instead.
pub async fn run_audit(
    state: &AppState,
    request: AuditRunRequest,
) -> Result<AuditRunResponse, AppError> {
    let run_id = Uuid::new_v4();
    let now = Utc::now();
    let thresholds = { state.thresholds.read().await.clone() };
    let partner = request.partner_id.as_deref();

    let booking_since = now - Duration::days(thresholds.booking_lookback_days());
    let payment_since = now - Duration::days(thresholds.payment_window_days);
    let refund_since = now - Duration::days(thresholds.refund_lookback_days());
    let settlement_since = now - Duration::days(thresholds.settlement_window_days);
    let webhook_since = now - Duration::days(thresholds.webhook_window_days);

    let reads = tokio::try_join!(
        state.ledger_repo.fetch_bookings_since(booking_since, partner),
        state.ledger_repo.fetch_payments_since(payment_since),
        state.ledger_repo.fetch_refunds_since(refund_since, partner),
        state
            .ledger_repo
            .fetch_settlements_since(settlement_since, partner),
        state.ledger_repo.fetch_partners(partner),
        state.ledger_repo.fetch_webhook_events_since(webhook_since),
    );
    let (bookings, payments, refunds, settlements, partners, webhook_events) = match reads {
        Ok(slices) => slices,
        Err(err) => {
            state.metrics.record_run_error();
            return Err(AppError::Store(err));
        }
    };
    debug!(
        %run_id,
        bookings = bookings.len(),
        payments = payments.len(),
        refunds = refunds.len(),
        settlements = settlements.len(),
        partners = partners.len(),
        webhook_events = webhook_events.len(),
        "windowed reads complete"
    );

    let snapshot = AuditSnapshot {
        now,
        bookings,
        payments,
        refunds,
        settlements,
        partners,
        webhook_events,
    };
    let report = run_audit_checks(&snapshot, &thresholds);
    state.metrics.record_run();
    state.metrics.record_anomalies(report.anomalies.len());
    info!(
        %run_id,
        anomalies = report.anomalies.len(),
        "audit computed"
    );

    let mut persisted = false;
    let mut persist_error = None;
    if request.persist {
        if report.anomalies.is_empty() {
            persisted = true;
        } else {
            match state.anomaly_repo.upsert_anomalies(&report.anomalies).await {
                Ok(ids) => {
                    state.metrics.record_persisted(ids.len());
                    persisted = true;
                    info!(%run_id, written = ids.len(), "anomalies persisted");
                }
                Err(err) => {
                    state.metrics.record_persist_error();
                    warn!(%run_id, "failed to persist anomalies: {}", err);
                    persist_error = Some(err.to_string());
                }
            }
        }
    }

    if !report.anomalies.is_empty() {
        state
            .alert_service
            .spawn_alerts(state.config.clone(), report.anomalies.clone());
    }

    Ok(AuditRunResponse::from_report(report, persisted, persist_error))
}
