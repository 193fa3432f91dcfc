use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use audit_domain::ports::{ensure_batch_within_cap, AnomalyRepository, LedgerRepository};
use audit_domain::{
    Anomaly, AnomalyKind, AnomalyRecord, BankDetails, Booking, KycRecord, Partner, Payment,
    Refund, Settlement, Severity, WebhookEvent,
};

use crate::utils::offset_to_chrono;

/// ClickHouse adapter for both the windowed-read and the idempotent-upsert
/// ports. Ledger tables are written by the transactional services upstream;
/// this repository only creates them for dev bootstrap and reads them.
#[derive(Clone)]
pub struct ClickhouseRepo {
    client: Client,
    database: String,
}

impl ClickhouseRepo {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    async fn fetch_recent<T>(
        &self,
        table: &str,
        columns: &str,
        time_field: &str,
        since: DateTime<Utc>,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<T>>
    where
        T: Row + for<'b> Deserialize<'b>,
    {
        let query = build_recent_query(table, columns, time_field, since, filter);
        let rows = self.client.query(&query).fetch_all::<T>().await?;
        Ok(rows)
    }
}

/// `time_field >= since`, newest first, at most one extra equality filter.
fn build_recent_query(
    table: &str,
    columns: &str,
    time_field: &str,
    since: DateTime<Utc>,
    filter: Option<(&str, &str)>,
) -> String {
    let mut query = format!(
        "SELECT {columns} FROM {table} WHERE {time_field} >= fromUnixTimestamp64Milli({})",
        since.timestamp_millis()
    );
    if let Some((column, value)) = filter {
        query.push_str(&format!(" AND {column} = '{}'", escape_literal(value)));
    }
    query.push_str(&format!(" ORDER BY {time_field} DESC"));
    query
}

#[async_trait]
impl LedgerRepository for ClickhouseRepo {
    async fn ensure_schema(&self) -> Result<()> {
        let create_db = format!("CREATE DATABASE IF NOT EXISTS {}", self.database);
        self.client.query(&create_db).execute().await?;

        let create_bookings = r#"
CREATE TABLE IF NOT EXISTS bookings (
    id String,
    partner_id String,
    amount Float64,
    status String,
    created_at DateTime64(3)
) ENGINE = MergeTree
PARTITION BY toDate(created_at)
ORDER BY (created_at, id)
"#;
        self.client.query(create_bookings).execute().await?;

        let create_payments = r#"
CREATE TABLE IF NOT EXISTS payments (
    id String,
    status String,
    created_at DateTime64(3)
) ENGINE = MergeTree
PARTITION BY toDate(created_at)
ORDER BY (created_at, id)
"#;
        self.client.query(create_payments).execute().await?;

        let create_refunds = r#"
CREATE TABLE IF NOT EXISTS refunds (
    id String,
    partner_id String,
    amount Float64,
    created_at DateTime64(3)
) ENGINE = MergeTree
PARTITION BY toDate(created_at)
ORDER BY (created_at, id)
"#;
        self.client.query(create_refunds).execute().await?;

        let create_settlements = r#"
CREATE TABLE IF NOT EXISTS settlements (
    id String,
    partner_id String,
    amount Float64,
    status String,
    created_at DateTime64(3)
) ENGINE = MergeTree
PARTITION BY toDate(created_at)
ORDER BY (created_at, id)
"#;
        self.client.query(create_settlements).execute().await?;

        let create_partners = r#"
CREATE TABLE IF NOT EXISTS partners (
    id String,
    tax_id String,
    national_id String,
    kyc_status String,
    kyc_updated_at DateTime64(3),
    account_number String,
    routing_code String
) ENGINE = ReplacingMergeTree
ORDER BY id
"#;
        self.client.query(create_partners).execute().await?;

        let create_webhook_events = r#"
CREATE TABLE IF NOT EXISTS webhook_events (
    id String,
    created_at DateTime64(3)
) ENGINE = MergeTree
PARTITION BY toDate(created_at)
ORDER BY (created_at, id)
"#;
        self.client.query(create_webhook_events).execute().await?;

        let create_anomalies = r#"
CREATE TABLE IF NOT EXISTS anomalies (
    id String,
    type String,
    severity String,
    message String,
    partner_id String,
    meta_json String,
    detected_at DateTime64(3)
) ENGINE = ReplacingMergeTree(detected_at)
ORDER BY id
"#;
        self.client.query(create_anomalies).execute().await?;
        Ok(())
    }

    async fn fetch_bookings_since(
        &self,
        since: DateTime<Utc>,
        partner_id: Option<&str>,
    ) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = self
            .fetch_recent(
                "bookings",
                "id, partner_id, amount, status, created_at",
                "created_at",
                since,
                partner_id.map(|id| ("partner_id", id)),
            )
            .await?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn fetch_payments_since(&self, since: DateTime<Utc>) -> Result<Vec<Payment>> {
        let rows: Vec<PaymentRow> = self
            .fetch_recent("payments", "id, status, created_at", "created_at", since, None)
            .await?;
        Ok(rows.into_iter().map(Payment::from).collect())
    }

    async fn fetch_refunds_since(
        &self,
        since: DateTime<Utc>,
        partner_id: Option<&str>,
    ) -> Result<Vec<Refund>> {
        let rows: Vec<RefundRow> = self
            .fetch_recent(
                "refunds",
                "id, partner_id, amount, created_at",
                "created_at",
                since,
                partner_id.map(|id| ("partner_id", id)),
            )
            .await?;
        Ok(rows.into_iter().map(Refund::from).collect())
    }

    async fn fetch_settlements_since(
        &self,
        since: DateTime<Utc>,
        partner_id: Option<&str>,
    ) -> Result<Vec<Settlement>> {
        let rows: Vec<SettlementRow> = self
            .fetch_recent(
                "settlements",
                "id, partner_id, amount, status, created_at",
                "created_at",
                since,
                partner_id.map(|id| ("partner_id", id)),
            )
            .await?;
        Ok(rows.into_iter().map(Settlement::from).collect())
    }

    async fn fetch_partners(&self, partner_id: Option<&str>) -> Result<Vec<Partner>> {
        let mut query = "SELECT id, tax_id, national_id, kyc_status, kyc_updated_at, \
             account_number, routing_code FROM partners FINAL"
            .to_string();
        if let Some(id) = partner_id {
            query.push_str(&format!(" WHERE id = '{}'", escape_literal(id)));
        }
        query.push_str(" ORDER BY id");
        let rows = self.client.query(&query).fetch_all::<PartnerRow>().await?;
        Ok(rows.into_iter().map(Partner::from).collect())
    }

    async fn fetch_webhook_events_since(&self, since: DateTime<Utc>) -> Result<Vec<WebhookEvent>> {
        let rows: Vec<WebhookEventRow> = self
            .fetch_recent("webhook_events", "id, created_at", "created_at", since, None)
            .await?;
        Ok(rows.into_iter().map(WebhookEvent::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        let _: u8 = self.client.query("SELECT toUInt8(1)").fetch_one().await?;
        Ok(())
    }
}

#[async_trait]
impl AnomalyRepository for ClickhouseRepo {
    async fn upsert_anomalies(&self, anomalies: &[Anomaly]) -> Result<Vec<String>> {
        ensure_batch_within_cap(anomalies.len())?;
        if anomalies.is_empty() {
            return Ok(Vec::new());
        }
        // ReplacingMergeTree keyed by id: writing the same id again replaces
        // the row on merge, so the store assigns detected_at here.
        let detected_at = OffsetDateTime::now_utc();
        let mut insert = self.client.insert("anomalies")?;
        let mut ids = Vec::with_capacity(anomalies.len());
        for anomaly in anomalies {
            insert.write(&AnomalyStoreRow::from_candidate(anomaly, detected_at)?).await?;
            ids.push(anomaly.id.clone());
        }
        insert.end().await?;
        Ok(ids)
    }

    async fn fetch_anomalies(
        &self,
        severity: Option<Severity>,
        partner_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AnomalyRecord>> {
        let mut query = "SELECT id, type, severity, message, partner_id, meta_json, detected_at \
             FROM anomalies FINAL WHERE 1 = 1"
            .to_string();
        if let Some(severity) = severity {
            query.push_str(&format!(" AND severity = '{}'", severity.as_str()));
        }
        if let Some(partner) = partner_id {
            query.push_str(&format!(" AND partner_id = '{}'", escape_literal(partner)));
        }
        query.push_str(&format!(" ORDER BY detected_at DESC LIMIT {limit}"));
        let rows = self
            .client
            .query(&query)
            .fetch_all::<AnomalyStoreRow>()
            .await?;
        Ok(rows.into_iter().filter_map(AnomalyStoreRow::into_record).collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct BookingRow {
    id: String,
    partner_id: String,
    amount: f64,
    status: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    created_at: OffsetDateTime,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            partner_id: row.partner_id,
            amount: row.amount,
            status: row.status,
            created_at: offset_to_chrono(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct PaymentRow {
    id: String,
    status: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    created_at: OffsetDateTime,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            status: row.status.as_str().into(),
            created_at: offset_to_chrono(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct RefundRow {
    id: String,
    partner_id: String,
    amount: f64,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    created_at: OffsetDateTime,
}

impl From<RefundRow> for Refund {
    fn from(row: RefundRow) -> Self {
        Refund {
            id: row.id,
            partner_id: row.partner_id,
            amount: row.amount,
            created_at: offset_to_chrono(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct SettlementRow {
    id: String,
    partner_id: String,
    amount: f64,
    status: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    created_at: OffsetDateTime,
}

impl From<SettlementRow> for Settlement {
    fn from(row: SettlementRow) -> Self {
        Settlement {
            id: row.id,
            partner_id: row.partner_id,
            amount: row.amount,
            status: row.status.as_str().into(),
            created_at: offset_to_chrono(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct PartnerRow {
    id: String,
    tax_id: String,
    national_id: String,
    kyc_status: String,
    // epoch millis of 0 marks "never updated"
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    kyc_updated_at: OffsetDateTime,
    account_number: String,
    routing_code: String,
}

impl From<PartnerRow> for Partner {
    fn from(row: PartnerRow) -> Self {
        let updated_at = if row.kyc_updated_at.unix_timestamp_nanos() == 0 {
            None
        } else {
            Some(offset_to_chrono(row.kyc_updated_at))
        };
        Partner {
            id: row.id,
            kyc: KycRecord {
                tax_id: non_empty(row.tax_id),
                national_id: non_empty(row.national_id),
                status: row.kyc_status.as_str().into(),
                updated_at,
            },
            bank: BankDetails {
                account_number: non_empty(row.account_number),
                routing_code: non_empty(row.routing_code),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct WebhookEventRow {
    id: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    created_at: OffsetDateTime,
}

impl From<WebhookEventRow> for WebhookEvent {
    fn from(row: WebhookEventRow) -> Self {
        WebhookEvent {
            id: row.id,
            created_at: offset_to_chrono(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct AnomalyStoreRow {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    severity: String,
    message: String,
    partner_id: String,
    meta_json: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    detected_at: OffsetDateTime,
}

impl AnomalyStoreRow {
    fn from_candidate(anomaly: &Anomaly, detected_at: OffsetDateTime) -> Result<Self> {
        Ok(Self {
            id: anomaly.id.clone(),
            kind: anomaly.kind.code().to_string(),
            severity: anomaly.severity.as_str().to_string(),
            message: anomaly.message.clone(),
            partner_id: anomaly.partner_id.clone().unwrap_or_default(),
            meta_json: serde_json::to_string(&anomaly.meta)?,
            detected_at,
        })
    }

    fn into_record(self) -> Option<AnomalyRecord> {
        let Some(kind) = AnomalyKind::parse(&self.kind) else {
            warn!("skipping anomaly row {} with unknown type {}", self.id, self.kind);
            return None;
        };
        let Some(severity) = Severity::parse(&self.severity) else {
            warn!(
                "skipping anomaly row {} with unknown severity {}",
                self.id, self.severity
            );
            return None;
        };
        Some(AnomalyRecord {
            id: self.id,
            kind,
            severity,
            message: self.message,
            partner_id: non_empty(self.partner_id),
            meta: serde_json::from_str(&self.meta_json).unwrap_or(serde_json::Value::Null),
            detected_at: offset_to_chrono(self.detected_at),
        })
    }
}

// Backslashes first, otherwise a value ending in `\` un-escapes the closing
// quote.
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use audit_domain::value_objects::{KycStatus, PaymentStatus, SettlementStatus};

    use super::*;
    use crate::utils::{chrono_to_offset, millis_to_offset};

    #[test]
    fn recent_query_bounds_orders_and_filters() {
        let since = Utc.with_ymd_and_hms(2026, 7, 24, 0, 0, 0).unwrap();
        let query = build_recent_query(
            "bookings",
            "id, partner_id, amount, status, created_at",
            "created_at",
            since,
            Some(("partner_id", "ptr_7")),
        );
        assert_eq!(
            query,
            format!(
                "SELECT id, partner_id, amount, status, created_at FROM bookings \
                 WHERE created_at >= fromUnixTimestamp64Milli({}) \
                 AND partner_id = 'ptr_7' ORDER BY created_at DESC",
                since.timestamp_millis()
            )
        );
    }

    #[test]
    fn recent_query_escapes_quotes_in_filter_values() {
        let since = Utc.with_ymd_and_hms(2026, 7, 24, 0, 0, 0).unwrap();
        let query = build_recent_query("refunds", "id", "created_at", since, Some(("partner_id", "o'brien")));
        assert!(query.contains("partner_id = 'o\\'brien'"));
    }

    #[test]
    fn trailing_backslash_cannot_unescape_the_closing_quote() {
        assert_eq!(escape_literal("ptr\\"), "ptr\\\\");
        assert_eq!(escape_literal("o'brien\\"), "o\\'brien\\\\");

        let since = Utc.with_ymd_and_hms(2026, 7, 24, 0, 0, 0).unwrap();
        let query = build_recent_query("refunds", "id", "created_at", since, Some(("partner_id", "ptr\\")));
        assert!(query.ends_with("AND partner_id = 'ptr\\\\' ORDER BY created_at DESC"));
    }

    #[test]
    fn partner_row_maps_blanks_and_epoch_to_absent() {
        let row = PartnerRow {
            id: "ptr_1".to_string(),
            tax_id: String::new(),
            national_id: "  ".to_string(),
            kyc_status: "approved".to_string(),
            kyc_updated_at: millis_to_offset(0),
            account_number: "ACC-1".to_string(),
            routing_code: String::new(),
        };
        let partner = Partner::from(row);
        assert!(partner.kyc.tax_id.is_none());
        assert!(partner.kyc.national_id.is_none());
        assert_eq!(partner.kyc.status, KycStatus::Approved);
        assert!(partner.kyc.updated_at.is_none());
        assert_eq!(partner.bank.account_number.as_deref(), Some("ACC-1"));
        assert!(partner.bank.routing_code.is_none());
    }

    #[test]
    fn ledger_rows_convert_statuses_and_timestamps() {
        let created = Utc.with_ymd_and_hms(2026, 8, 20, 9, 30, 0).unwrap();
        let payment = Payment::from(PaymentRow {
            id: "pay_1".to_string(),
            status: "failed".to_string(),
            created_at: chrono_to_offset(created),
        });
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.created_at, created);

        let settlement = Settlement::from(SettlementRow {
            id: "stl_1".to_string(),
            partner_id: "ptr_1".to_string(),
            amount: 7_500.0,
            status: "APPROVED".to_string(),
            created_at: chrono_to_offset(created),
        });
        assert_eq!(settlement.status, SettlementStatus::Approved);
    }

    #[test]
    fn anomaly_row_round_trips_to_record() {
        let anomaly = Anomaly::new(
            AnomalyKind::NegativeMargin,
            "ptr_9",
            Severity::High,
            "partner ptr_9 margin is -2000.00".to_string(),
            Some("ptr_9".to_string()),
            json!({"margin": -2000.0}),
        );
        let detected_at = chrono_to_offset(Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap());
        let row = AnomalyStoreRow::from_candidate(&anomaly, detected_at).expect("row");
        assert_eq!(row.kind, "NEGATIVE_MARGIN");
        assert_eq!(row.severity, "high");

        let record = row.into_record().expect("record");
        assert_eq!(record.id, anomaly.id);
        assert_eq!(record.kind, AnomalyKind::NegativeMargin);
        assert_eq!(record.meta["margin"], -2000.0);
        assert_eq!(record.partner_id.as_deref(), Some("ptr_9"));
    }

    #[test]
    fn unknown_row_type_is_skipped() {
        let row = AnomalyStoreRow {
            id: "legacy:1".to_string(),
            kind: "LEGACY_RULE".to_string(),
            severity: "high".to_string(),
            message: String::new(),
            partner_id: String::new(),
            meta_json: "{}".to_string(),
            detected_at: millis_to_offset(0),
        };
        assert!(row.into_record().is_none());
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_before_any_write() {
        let repo = ClickhouseRepo::new(Client::default(), "finsentry".to_string());
        let anomalies: Vec<Anomaly> = (0..501)
            .map(|n| {
                Anomaly::new(
                    AnomalyKind::StaleKyc,
                    &format!("ptr_{n}"),
                    Severity::Low,
                    "stale".to_string(),
                    Some(format!("ptr_{n}")),
                    json!({}),
                )
            })
            .collect();
        let err = repo
            .upsert_anomalies(&anomalies)
            .await
            .expect_err("cap enforced");
        assert!(err.to_string().contains("500-operation cap"));
    }
}
