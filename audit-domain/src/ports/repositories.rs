use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    Anomaly,
    AnomalyRecord,
    AuditThresholds,
    Booking,
    Partner,
    Payment,
    Refund,
    Settlement,
    WebhookEvent,
};
use crate::value_objects::Severity;

/// Hard cap on one atomic anomaly write batch, inherited from the store's
/// batched-write limit. Oversized batches are rejected; callers must split.
pub const MAX_WRITE_BATCH_OPS: usize = 500;

pub fn ensure_batch_within_cap(ops: usize) -> anyhow::Result<()> {
    if ops > MAX_WRITE_BATCH_OPS {
        anyhow::bail!(
            "write batch of {} operations exceeds the {}-operation cap; split the batch",
            ops,
            MAX_WRITE_BATCH_OPS
        );
    }
    Ok(())
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    async fn fetch_bookings_since(
        &self,
        since: DateTime<Utc>,
        partner_id: Option<&str>,
    ) -> anyhow::Result<Vec<Booking>>;
    async fn fetch_payments_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Payment>>;
    async fn fetch_refunds_since(
        &self,
        since: DateTime<Utc>,
        partner_id: Option<&str>,
    ) -> anyhow::Result<Vec<Refund>>;
    async fn fetch_settlements_since(
        &self,
        since: DateTime<Utc>,
        partner_id: Option<&str>,
    ) -> anyhow::Result<Vec<Settlement>>;
    async fn fetch_partners(&self, partner_id: Option<&str>) -> anyhow::Result<Vec<Partner>>;
    async fn fetch_webhook_events_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<WebhookEvent>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AnomalyRepository: Send + Sync {
    /// Upserts each anomaly under its deterministic id as one atomic batch
    /// and returns the written ids. Must reject batches over
    /// [`MAX_WRITE_BATCH_OPS`] instead of chunking.
    async fn upsert_anomalies(&self, anomalies: &[Anomaly]) -> anyhow::Result<Vec<String>>;
    async fn fetch_anomalies(
        &self,
        severity: Option<Severity>,
        partner_id: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<AnomalyRecord>>;
}

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn load_thresholds(&self, path: &str) -> anyhow::Result<AuditThresholds>;
    async fn save_thresholds(&self, path: &str, thresholds: &AuditThresholds)
        -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_cap_allows_up_to_500_ops() {
        ensure_batch_within_cap(0).expect("empty batch");
        ensure_batch_within_cap(500).expect("batch at cap");
    }

    #[test]
    fn batch_cap_rejects_501_ops() {
        let err = ensure_batch_within_cap(501).expect_err("over cap");
        assert!(err.to_string().contains("501"));
        assert!(err.to_string().contains("500"));
    }
}
