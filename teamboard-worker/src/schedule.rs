/// Wall-clock helpers for the daily reminder run
///
/// All times are UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// First instant strictly after `now` at `hour:00:00`
///
/// `hour` must be below 24; larger values wrap.
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(time).and_utc();

    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Deadline dates covered by a run at `now` looking `window_hours` ahead
pub fn deadline_window(now: DateTime<Utc>, window_hours: i64) -> (NaiveDate, NaiveDate) {
    let from = now.date_naive();
    let to = (now + Duration::hours(window_hours.max(0))).date_naive();
    (from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 6, 30, 0).unwrap();
        assert_eq!(next_run_after(now, 8), Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(next_run_after(now, 8), Utc.with_ymd_and_hms(2025, 3, 11, 8, 0, 0).unwrap());

        let late = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(next_run_after(late, 0), Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_deadline_window() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        let (from, to) = deadline_window(now, 24);
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());

        assert_eq!(deadline_window(now, 0), (from, from));
    }
}
