use chrono::{DateTime, Utc};
use time::OffsetDateTime;

// The clickhouse crate speaks `time`, the domain speaks `chrono`; rows cross
// the boundary as unix milliseconds.

pub fn millis_to_offset(ms: i64) -> OffsetDateTime {
    let nanos = i128::from(ms).saturating_mul(1_000_000);
    OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn offset_to_chrono(ts: OffsetDateTime) -> DateTime<Utc> {
    let ms = (ts.unix_timestamp_nanos() / 1_000_000) as i64;
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn chrono_to_offset(ts: DateTime<Utc>) -> OffsetDateTime {
    millis_to_offset(ts.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn chrono_and_time_round_trip_at_millis_precision() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 23, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(250);
        let round_tripped = offset_to_chrono(chrono_to_offset(ts));
        assert_eq!(round_tripped, ts);
    }

    #[test]
    fn zero_millis_is_the_epoch() {
        assert_eq!(offset_to_chrono(millis_to_offset(0)), DateTime::UNIX_EPOCH);
    }
}
