// Anomaly kind value object

use serde::{Deserialize, Serialize};

/// The audit rule families. Serialized as SCREAMING_SNAKE_CASE codes on the
/// wire and in persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    DelayedSettlement,
    HighRefundRatio,
    BookingSpike,
    PaymentFailureSpike,
    NegativeMargin,
    DuplicateKyc,
    MissingBankDetails,
    StaleKyc,
    UnusualTicketSize,
    WebhookGap,
}

impl AnomalyKind {
    pub fn code(&self) -> &'static str {
        match self {
            AnomalyKind::DelayedSettlement => "DELAYED_SETTLEMENT",
            AnomalyKind::HighRefundRatio => "HIGH_REFUND_RATIO",
            AnomalyKind::BookingSpike => "BOOKING_SPIKE",
            AnomalyKind::PaymentFailureSpike => "PAYMENT_FAILURE_SPIKE",
            AnomalyKind::NegativeMargin => "NEGATIVE_MARGIN",
            AnomalyKind::DuplicateKyc => "DUPLICATE_KYC",
            AnomalyKind::MissingBankDetails => "MISSING_BANK_DETAILS",
            AnomalyKind::StaleKyc => "STALE_KYC",
            AnomalyKind::UnusualTicketSize => "UNUSUAL_TICKET_SIZE",
            AnomalyKind::WebhookGap => "WEBHOOK_GAP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DELAYED_SETTLEMENT" => Some(AnomalyKind::DelayedSettlement),
            "HIGH_REFUND_RATIO" => Some(AnomalyKind::HighRefundRatio),
            "BOOKING_SPIKE" => Some(AnomalyKind::BookingSpike),
            "PAYMENT_FAILURE_SPIKE" => Some(AnomalyKind::PaymentFailureSpike),
            "NEGATIVE_MARGIN" => Some(AnomalyKind::NegativeMargin),
            "DUPLICATE_KYC" => Some(AnomalyKind::DuplicateKyc),
            "MISSING_BANK_DETAILS" => Some(AnomalyKind::MissingBankDetails),
            "STALE_KYC" => Some(AnomalyKind::StaleKyc),
            "UNUSUAL_TICKET_SIZE" => Some(AnomalyKind::UnusualTicketSize),
            "WEBHOOK_GAP" => Some(AnomalyKind::WebhookGap),
            _ => None,
        }
    }
}
