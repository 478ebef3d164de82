use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Date range actually requested from the market-data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Clamp a requested range to what can have data as of `now_utc`.
///
/// Returns `None` when the range starts after today; there is nothing to fetch.
pub fn resolve_fetch_window(
    start: NaiveDate,
    end: NaiveDate,
    now_utc: DateTime<Utc>,
) -> Option<FetchWindow> {
    let today = now_utc.date_naive();
    if start > today {
        return None;
    }
    Some(FetchWindow {
        start,
        end: end.min(today),
    })
}

/// Largest number of weekdays skipped between consecutive dates.
///
/// Weekends never count as missing, so Friday followed by Monday is a gap of 0.
pub fn largest_weekday_gap(dates: &[NaiveDate]) -> u32 {
    dates
        .windows(2)
        .map(|w| missing_weekdays(w[0], w[1]))
        .max()
        .unwrap_or(0)
}

fn missing_weekdays(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut missing = 0;
    let mut d = from + Duration::days(1);
    while d < to {
        if !is_weekend(d) {
            missing += 1;
        }
        d = d + Duration::days(1);
    }
    missing
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn future_start_has_no_window() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        assert_eq!(resolve_fetch_window(d(2030, 1, 1), d(2030, 6, 1), now), None);
    }

    #[test]
    fn clamps_end_to_today() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let w = resolve_fetch_window(d(2025, 12, 1), d(2026, 3, 1), now).unwrap();
        assert_eq!(w.start, d(2025, 12, 1));
        assert_eq!(w.end, d(2026, 1, 5));
    }

    #[test]
    fn past_range_is_untouched() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let w = resolve_fetch_window(d(2024, 1, 1), d(2024, 2, 1), now).unwrap();
        assert_eq!(w.end, d(2024, 2, 1));
    }

    #[test]
    fn weekend_is_not_a_gap() {
        // 2026-01-02 is Friday, 2026-01-05 is Monday.
        assert_eq!(largest_weekday_gap(&[d(2026, 1, 2), d(2026, 1, 5)]), 0);
    }

    #[test]
    fn counts_skipped_weekdays() {
        // Monday to the following Monday skips four weekdays.
        let dates = [d(2026, 1, 2), d(2026, 1, 5), d(2026, 1, 12)];
        assert_eq!(largest_weekday_gap(&dates), 4);
        assert_eq!(largest_weekday_gap(&[d(2026, 1, 5)]), 0);
    }
}
