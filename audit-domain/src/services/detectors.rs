// Heuristic detectors
// Ten independent pure rules. Each reads the shared snapshot/indexes plus the
// threshold set and emits zero or more findings; none depends on another's
// output, so registry order only affects report ordering.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::entities::{Anomaly, AuditThresholds, Payment};
use crate::services::aggregate::{count_by_day, AuditIndex, AuditSnapshot};
use crate::utils::{age_days, age_hours, day_key, start_of_day};
use crate::value_objects::{AnomalyKind, Severity};

pub type Detector = fn(&AuditSnapshot, &AuditIndex<'_>, &AuditThresholds) -> Vec<Anomaly>;

/// Registry evaluated in order by the engine.
pub const DETECTORS: &[Detector] = &[
    delayed_settlements,
    high_refund_ratio,
    booking_spike,
    payment_failure_spike,
    negative_margin,
    duplicate_identifiers,
    missing_bank_details,
    stale_kyc,
    unusual_ticket_size,
    webhook_gap,
];

/// Settlements still pending or approved past the configured age.
pub fn delayed_settlements(
    snapshot: &AuditSnapshot,
    _index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    for settlement in &snapshot.settlements {
        if !settlement.status.is_unsettled() {
            continue;
        }
        let age = age_days(snapshot.now, settlement.created_at);
        if age > thresholds.settlement_max_age_days {
            anomalies.push(Anomaly::new(
                AnomalyKind::DelayedSettlement,
                &settlement.id,
                Severity::High,
                format!(
                    "settlement {} for partner {} has been {} for {:.1} days",
                    settlement.id,
                    settlement.partner_id,
                    settlement.status.as_str(),
                    age
                ),
                Some(settlement.partner_id.clone()),
                json!({
                    "settlement_id": settlement.id,
                    "status": settlement.status.as_str(),
                    "amount": settlement.amount,
                    "age_days": round2(age),
                    "max_age_days": thresholds.settlement_max_age_days,
                }),
            ));
        }
    }
    anomalies
}

/// Refund count over booking count per partner. Partners without bookings in
/// the window are skipped (no denominator).
pub fn high_refund_ratio(
    snapshot: &AuditSnapshot,
    index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let since = snapshot.now - Duration::days(thresholds.refund_window_days);
    let mut anomalies = Vec::new();
    for (partner_id, bookings) in &index.bookings_by_partner {
        let booking_count = bookings.iter().filter(|b| b.created_at >= since).count();
        if booking_count == 0 {
            continue;
        }
        let refund_count = index
            .refunds_by_partner
            .get(partner_id)
            .map(|refunds| refunds.iter().filter(|r| r.created_at >= since).count())
            .unwrap_or(0);
        let ratio = refund_count as f64 / booking_count as f64;
        if ratio < thresholds.refund_ratio_high {
            continue;
        }
        let severity = if ratio >= thresholds.refund_ratio_critical {
            Severity::Critical
        } else {
            Severity::High
        };
        anomalies.push(Anomaly::new(
            AnomalyKind::HighRefundRatio,
            partner_id,
            severity,
            format!(
                "partner {} refunded {} of {} bookings in the last {} days (ratio {:.2})",
                partner_id, refund_count, booking_count, thresholds.refund_window_days, ratio
            ),
            Some((*partner_id).to_string()),
            json!({
                "refunds": refund_count,
                "bookings": booking_count,
                "ratio": round2(ratio),
                "window_days": thresholds.refund_window_days,
            }),
        ));
    }
    anomalies
}

/// Today's booking count per partner against the prior-days daily average.
/// A zero baseline never spikes, whatever today's count.
pub fn booking_spike(
    snapshot: &AuditSnapshot,
    index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let today = day_key(snapshot.now);
    let baseline_start = day_key(
        start_of_day(snapshot.now) - Duration::days(thresholds.booking_spike_baseline_days),
    );
    let mut anomalies = Vec::new();
    for (partner_id, bookings) in &index.bookings_by_partner {
        let series = count_by_day(bookings, |booking| booking.created_at);
        let today_count = series.get(&today).copied().unwrap_or(0);
        let baseline_total: u64 = series
            .range(baseline_start.clone()..today.clone())
            .map(|(_, count)| *count)
            .sum();
        if baseline_total == 0 {
            continue;
        }
        let baseline_avg = baseline_total as f64 / thresholds.booking_spike_baseline_days as f64;
        if (today_count as f64) < thresholds.booking_spike_multiplier * baseline_avg {
            continue;
        }
        let key = format!("{partner_id}:{today}");
        anomalies.push(Anomaly::new(
            AnomalyKind::BookingSpike,
            &key,
            Severity::Medium,
            format!(
                "partner {} made {} bookings today against a {:.1}/day baseline",
                partner_id, today_count, baseline_avg
            ),
            Some((*partner_id).to_string()),
            json!({
                "day": today,
                "today": today_count,
                "baseline_daily_avg": round2(baseline_avg),
                "baseline_days": thresholds.booking_spike_baseline_days,
            }),
        ));
    }
    anomalies
}

/// Platform-wide failed-payment count today against the prior-days average.
pub fn payment_failure_spike(
    snapshot: &AuditSnapshot,
    _index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let failed: Vec<&Payment> = snapshot
        .payments
        .iter()
        .filter(|payment| payment.status.is_failed())
        .collect();
    let series = count_by_day(&failed, |payment| payment.created_at);
    let today = day_key(snapshot.now);
    let baseline_start = day_key(
        start_of_day(snapshot.now) - Duration::days(thresholds.payment_failure_baseline_days),
    );
    let today_count = series.get(&today).copied().unwrap_or(0);
    let baseline_total: u64 = series
        .range(baseline_start.clone()..today.clone())
        .map(|(_, count)| *count)
        .sum();
    if baseline_total == 0 {
        return Vec::new();
    }
    let baseline_avg = baseline_total as f64 / thresholds.payment_failure_baseline_days as f64;
    if (today_count as f64) < thresholds.payment_failure_multiplier * baseline_avg {
        return Vec::new();
    }
    vec![Anomaly::new(
        AnomalyKind::PaymentFailureSpike,
        &today,
        Severity::High,
        format!(
            "{} failed payments today against a {:.1}/day baseline",
            today_count, baseline_avg
        ),
        None,
        json!({
            "day": today,
            "today": today_count,
            "baseline_daily_avg": round2(baseline_avg),
            "baseline_days": thresholds.payment_failure_baseline_days,
            "series": series,
        }),
    )]
}

/// Commission earned minus refunds issued per partner over the margin window.
pub fn negative_margin(
    snapshot: &AuditSnapshot,
    index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let since = snapshot.now - Duration::days(thresholds.margin_window_days);
    let partner_ids: BTreeSet<&str> = index
        .bookings_by_partner
        .keys()
        .chain(index.refunds_by_partner.keys())
        .copied()
        .collect();
    let mut anomalies = Vec::new();
    for partner_id in partner_ids {
        let gross: f64 = index
            .bookings_by_partner
            .get(partner_id)
            .map(|bookings| {
                bookings
                    .iter()
                    .filter(|b| b.created_at >= since)
                    .map(|b| b.amount)
                    .sum()
            })
            .unwrap_or(0.0);
        let refunded: f64 = index
            .refunds_by_partner
            .get(partner_id)
            .map(|refunds| {
                refunds
                    .iter()
                    .filter(|r| r.created_at >= since)
                    .map(|r| r.amount)
                    .sum()
            })
            .unwrap_or(0.0);
        let commission = thresholds.commission_rate * gross;
        let margin = commission - refunded;
        if margin >= 0.0 || margin.abs() < thresholds.margin_alert_floor {
            continue;
        }
        anomalies.push(Anomaly::new(
            AnomalyKind::NegativeMargin,
            partner_id,
            Severity::High,
            format!(
                "partner {} margin is {:.2} over the last {} days (commission {:.2}, refunds {:.2})",
                partner_id, margin, thresholds.margin_window_days, commission, refunded
            ),
            Some(partner_id.to_string()),
            json!({
                "gross_bookings": round2(gross),
                "commission": round2(commission),
                "refunds": round2(refunded),
                "margin": round2(margin),
                "window_days": thresholds.margin_window_days,
            }),
        ));
    }
    anomalies
}

/// Identifier values (tax id, national id, bank account) shared by two or
/// more partners. Blank values never form a duplicate group.
pub fn duplicate_identifiers(
    snapshot: &AuditSnapshot,
    _index: &AuditIndex<'_>,
    _thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let mut by_value: BTreeMap<&str, (BTreeSet<&str>, BTreeSet<&'static str>)> = BTreeMap::new();
    for partner in &snapshot.partners {
        let candidates = [
            ("tax_id", partner.kyc.tax_id.as_deref()),
            ("national_id", partner.kyc.national_id.as_deref()),
            ("account_number", partner.bank.account_number.as_deref()),
        ];
        for (field, value) in candidates {
            let Some(value) = value else { continue };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let entry = by_value.entry(value).or_default();
            entry.0.insert(partner.id.as_str());
            entry.1.insert(field);
        }
    }

    let mut anomalies = Vec::new();
    for (value, (partners, fields)) in by_value {
        if partners.len() < 2 {
            continue;
        }
        let partner_ids: Vec<&str> = partners.into_iter().collect();
        let digest = identifier_digest(value);
        let masked = mask_identifier(value);
        let message = format!(
            "identifier ending {} is shared by partners {}",
            masked,
            partner_ids.join(", ")
        );
        let meta = json!({
            "identifier_masked": masked,
            "fields": fields.into_iter().collect::<Vec<&str>>(),
            "partner_ids": partner_ids,
        });
        anomalies.push(Anomaly::new(
            AnomalyKind::DuplicateKyc,
            &digest,
            Severity::Critical,
            message,
            None,
            meta,
        ));
    }
    anomalies
}

pub fn missing_bank_details(
    snapshot: &AuditSnapshot,
    _index: &AuditIndex<'_>,
    _thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    for partner in &snapshot.partners {
        let mut missing = Vec::new();
        if is_blank(&partner.bank.account_number) {
            missing.push("account_number");
        }
        if is_blank(&partner.bank.routing_code) {
            missing.push("routing_code");
        }
        if missing.is_empty() {
            continue;
        }
        anomalies.push(Anomaly::new(
            AnomalyKind::MissingBankDetails,
            &partner.id,
            Severity::Medium,
            format!(
                "partner {} has no {} on file",
                partner.id,
                missing.join(" or ")
            ),
            Some(partner.id.clone()),
            json!({ "missing": missing }),
        ));
    }
    anomalies
}

/// Approved KYC records untouched for longer than the configured age.
/// Records without an update timestamp cannot be aged and are skipped.
pub fn stale_kyc(
    snapshot: &AuditSnapshot,
    _index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    for partner in &snapshot.partners {
        if !partner.kyc.status.is_approved() {
            continue;
        }
        let Some(updated_at) = partner.kyc.updated_at else {
            continue;
        };
        let age = age_days(snapshot.now, updated_at);
        if age > thresholds.kyc_max_age_days {
            anomalies.push(Anomaly::new(
                AnomalyKind::StaleKyc,
                &partner.id,
                Severity::Low,
                format!(
                    "partner {} KYC was last updated {:.0} days ago",
                    partner.id, age
                ),
                Some(partner.id.clone()),
                json!({
                    "age_days": round2(age),
                    "max_age_days": thresholds.kyc_max_age_days,
                }),
            ));
        }
    }
    anomalies
}

/// Z-score of each partner's mean booking amount against the population of
/// all booking amounts in the window. Skipped entirely when the population
/// has no variance.
pub fn unusual_ticket_size(
    snapshot: &AuditSnapshot,
    index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    let since = snapshot.now - Duration::days(thresholds.ticket_window_days);
    let population: Vec<f64> = snapshot
        .bookings
        .iter()
        .filter(|b| b.created_at >= since)
        .map(|b| b.amount)
        .collect();
    if population.is_empty() {
        return Vec::new();
    }
    let population_mean = mean(&population);
    let population_std = population_std_dev(&population, population_mean);
    if population_std < 0.001 {
        return Vec::new();
    }

    let mut anomalies = Vec::new();
    for (partner_id, bookings) in &index.bookings_by_partner {
        let amounts: Vec<f64> = bookings
            .iter()
            .filter(|b| b.created_at >= since)
            .map(|b| b.amount)
            .collect();
        if amounts.is_empty() {
            continue;
        }
        let partner_mean = mean(&amounts);
        let z = (partner_mean - population_mean) / population_std;
        if z.abs() < thresholds.ticket_zscore_threshold {
            continue;
        }
        anomalies.push(Anomaly::new(
            AnomalyKind::UnusualTicketSize,
            partner_id,
            Severity::Medium,
            format!(
                "partner {} mean ticket {:.2} sits {:.1} standard deviations from the population mean {:.2}",
                partner_id, partner_mean, z, population_mean
            ),
            Some((*partner_id).to_string()),
            json!({
                "partner_mean": round2(partner_mean),
                "population_mean": round2(population_mean),
                "population_std_dev": round2(population_std),
                "z_score": round2(z),
                "window_days": thresholds.ticket_window_days,
            }),
        ));
    }
    anomalies
}

/// Elapsed time since the most recent inbound payment webhook. An empty
/// window is itself reported as a gap.
pub fn webhook_gap(
    snapshot: &AuditSnapshot,
    _index: &AuditIndex<'_>,
    thresholds: &AuditThresholds,
) -> Vec<Anomaly> {
    match snapshot.webhook_events.iter().map(|e| e.created_at).max() {
        Some(latest) => {
            let gap = age_hours(snapshot.now, latest);
            if gap <= thresholds.webhook_max_gap_hours {
                return Vec::new();
            }
            let key = latest.timestamp_millis().to_string();
            vec![Anomaly::new(
                AnomalyKind::WebhookGap,
                &key,
                Severity::High,
                format!(
                    "no payment webhooks for {:.1} hours (last at {})",
                    gap,
                    latest.to_rfc3339()
                ),
                None,
                json!({
                    "gap_hours": round2(gap),
                    "max_gap_hours": thresholds.webhook_max_gap_hours,
                    "last_event_at": latest.to_rfc3339(),
                }),
            )]
        }
        None => vec![Anomaly::new(
            AnomalyKind::WebhookGap,
            "none",
            Severity::High,
            format!(
                "no payment webhooks in the last {} days",
                thresholds.webhook_window_days
            ),
            None,
            json!({
                "max_gap_hours": thresholds.webhook_max_gap_hours,
                "window_days": thresholds.webhook_window_days,
                "last_event_at": null,
            }),
        )],
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Short stable digest so raw identifier values never appear in anomaly ids.
fn identifier_digest(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in &digest[..8] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn mask_identifier(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("***{tail}")
}
