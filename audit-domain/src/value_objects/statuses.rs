// Ledger status value objects
//
// Upstream systems feed these as free-form strings; unrecognized values map
// to `Unknown` instead of failing the whole audit window.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Approved,
    Paid,
    Failed,
    Unknown,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Approved => "approved",
            SettlementStatus::Paid => "paid",
            SettlementStatus::Failed => "failed",
            SettlementStatus::Unknown => "unknown",
        }
    }

    /// Funds not yet released to the partner.
    pub fn is_unsettled(&self) -> bool {
        matches!(self, SettlementStatus::Pending | SettlementStatus::Approved)
    }
}

impl From<&str> for SettlementStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => SettlementStatus::Pending,
            "approved" => SettlementStatus::Approved,
            "paid" => SettlementStatus::Paid,
            "failed" => SettlementStatus::Failed,
            _ => SettlementStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Succeeded,
    Pending,
    Failed,
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Unknown => "unknown",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PaymentStatus::Failed)
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "succeeded" => PaymentStatus::Succeeded,
            "pending" => PaymentStatus::Pending,
            "failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
    Unknown,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
            KycStatus::Unknown => "unknown",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, KycStatus::Approved)
    }
}

impl From<&str> for KycStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => KycStatus::Pending,
            "approved" => KycStatus::Approved,
            "rejected" => KycStatus::Rejected,
            _ => KycStatus::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsettled_covers_pending_and_approved_only() {
        assert!(SettlementStatus::Pending.is_unsettled());
        assert!(SettlementStatus::Approved.is_unsettled());
        assert!(!SettlementStatus::Paid.is_unsettled());
        assert!(!SettlementStatus::Failed.is_unsettled());
        assert!(!SettlementStatus::Unknown.is_unsettled());
    }

    #[test]
    fn unrecognized_statuses_map_to_unknown() {
        assert_eq!(SettlementStatus::from("queued"), SettlementStatus::Unknown);
        assert_eq!(PaymentStatus::from("charged_back"), PaymentStatus::Unknown);
        assert_eq!(KycStatus::from("in_review"), KycStatus::Unknown);
    }

    #[test]
    fn status_parsing_ignores_case() {
        assert_eq!(SettlementStatus::from("PAID"), SettlementStatus::Paid);
        assert_eq!(PaymentStatus::from("Failed"), PaymentStatus::Failed);
        assert_eq!(KycStatus::from("APPROVED"), KycStatus::Approved);
    }
}
