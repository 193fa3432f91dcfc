// Ledger entities
// In-memory shape of the finance records an audit run reads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{KycStatus, PaymentStatus, SettlementStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub partner_id: String,
    pub amount: f64,
    #[serde(default)]
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub partner_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub partner_id: String,
    pub amount: f64,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    #[serde(default)]
    pub kyc: KycRecord,
    #[serde(default)]
    pub bank: BankDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycRecord {
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    pub status: KycStatus,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for KycRecord {
    fn default() -> Self {
        Self {
            tax_id: None,
            national_id: None,
            status: KycStatus::Unknown,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub routing_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub created_at: DateTime<Utc>,
}
