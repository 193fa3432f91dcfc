use chrono::{DateTime, NaiveTime, Utc};

/// Calendar-day bucket key in UTC, e.g. "2026-08-23".
pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Fractional days elapsed between `then` and `now`. Negative when `then` is in the future.
pub fn age_days(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    (now - then).num_seconds() as f64 / 86_400.0
}

pub fn age_hours(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    (now - then).num_seconds() as f64 / 3_600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_key_formats_utc_date() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 23, 17, 45, 0).unwrap();
        assert_eq!(day_key(ts), "2026-08-23");
    }

    #[test]
    fn start_of_day_truncates_time() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 23, 17, 45, 31).unwrap();
        assert_eq!(
            start_of_day(ts),
            Utc.with_ymd_and_hms(2026, 8, 23, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn age_days_is_fractional() {
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap();
        let then = Utc.with_ymd_and_hms(2026, 8, 16, 0, 0, 0).unwrap();
        assert!((age_days(now, then) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn age_hours_is_fractional() {
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 12, 30, 0).unwrap();
        let then = Utc.with_ymd_and_hms(2026, 8, 22, 12, 0, 0).unwrap();
        assert!((age_hours(now, then) - 24.5).abs() < 1e-9);
    }
}
