// Snapshot aggregation
// Windowed reads land in an AuditSnapshot; AuditIndex groups them once so the
// detectors never re-scan raw record lists per rule.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::entities::{Booking, Partner, Payment, Refund, Settlement, WebhookEvent};
use crate::utils::day_key;

/// Everything one audit run reads, fetched concurrently before any detector
/// executes. `now` is the run's start time; all window math derives from it.
#[derive(Debug, Clone)]
pub struct AuditSnapshot {
    pub now: DateTime<Utc>,
    pub bookings: Vec<Booking>,
    pub payments: Vec<Payment>,
    pub refunds: Vec<Refund>,
    pub settlements: Vec<Settlement>,
    pub partners: Vec<Partner>,
    pub webhook_events: Vec<WebhookEvent>,
}

/// Shared per-partner groupings over a snapshot. Borrows the snapshot so
/// detectors work off one set of indexes without cloning records.
#[derive(Debug, Default)]
pub struct AuditIndex<'a> {
    pub bookings_by_partner: BTreeMap<&'a str, Vec<&'a Booking>>,
    pub refunds_by_partner: BTreeMap<&'a str, Vec<&'a Refund>>,
}

impl<'a> AuditIndex<'a> {
    pub fn build(snapshot: &'a AuditSnapshot) -> Self {
        let mut index = AuditIndex::default();
        for booking in &snapshot.bookings {
            index
                .bookings_by_partner
                .entry(booking.partner_id.as_str())
                .or_default()
                .push(booking);
        }
        for refund in &snapshot.refunds {
            index
                .refunds_by_partner
                .entry(refund.partner_id.as_str())
                .or_default()
                .push(refund);
        }
        index
    }
}

/// Buckets records into UTC calendar-day counts.
pub fn count_by_day<T>(
    records: &[&T],
    time_of: impl Fn(&T) -> DateTime<Utc>,
) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(day_key(time_of(record))).or_insert(0u64) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking(id: &str, partner: &str, day: u32) -> Booking {
        Booking {
            id: id.to_string(),
            partner_id: partner.to_string(),
            amount: 100.0,
            status: "confirmed".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap(),
        }
    }

    fn snapshot_with(bookings: Vec<Booking>, refunds: Vec<Refund>) -> AuditSnapshot {
        AuditSnapshot {
            now: Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap(),
            bookings,
            payments: Vec::new(),
            refunds,
            settlements: Vec::new(),
            partners: Vec::new(),
            webhook_events: Vec::new(),
        }
    }

    #[test]
    fn index_groups_bookings_and_refunds_by_partner() {
        let snapshot = snapshot_with(
            vec![
                booking("b1", "ptr_a", 20),
                booking("b2", "ptr_a", 21),
                booking("b3", "ptr_b", 21),
            ],
            vec![Refund {
                id: "r1".to_string(),
                partner_id: "ptr_a".to_string(),
                amount: 40.0,
                created_at: Utc.with_ymd_and_hms(2026, 8, 21, 9, 0, 0).unwrap(),
            }],
        );
        let index = AuditIndex::build(&snapshot);
        assert_eq!(index.bookings_by_partner.get("ptr_a").map(Vec::len), Some(2));
        assert_eq!(index.bookings_by_partner.get("ptr_b").map(Vec::len), Some(1));
        assert_eq!(index.refunds_by_partner.get("ptr_a").map(Vec::len), Some(1));
        assert!(index.refunds_by_partner.get("ptr_b").is_none());
    }

    #[test]
    fn count_by_day_buckets_on_utc_dates() {
        let records = vec![
            booking("b1", "ptr_a", 20),
            booking("b2", "ptr_a", 20),
            booking("b3", "ptr_a", 22),
        ];
        let refs: Vec<&Booking> = records.iter().collect();
        let counts = count_by_day(&refs, |b| b.created_at);
        assert_eq!(counts.get("2026-08-20"), Some(&2));
        assert_eq!(counts.get("2026-08-22"), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
