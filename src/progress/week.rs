//! Calendar helpers used to bucket completion timestamps.
//!
//! Weeks are ISO weeks anchored on Thursday: a date belongs to the week (and
//! the year) of the Thursday in the same Monday-Sunday span.
//!
//! Known limitation: week equality is computed from `(year, week)` pairs
//! only, so late-December and early-January dates are grouped with whichever
//! ISO year their Thursday falls in (e.g. 2020-W53 spans into January 2021).
//! This matches the dashboards' calendar, not the Gregorian year.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Trailing weeks covered by the four-week window, not counting the current one.
const LOOKBACK_DAYS: i64 = 21;

/// Returns the ISO `(year, week)` of `date`, evaluated at UTC midnight.
pub fn iso_week(date: DateTime<Utc>) -> (i32, u32) {
    let day = date.date_naive();
    // Monday = 1 .. Sunday = 7
    let weekday = i64::from(day.weekday().number_from_monday());
    let thursday = day + Duration::days(4 - weekday);
    let week = (thursday.ordinal0() + 7) / 7;
    (thursday.year(), week)
}

pub fn is_this_week(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    iso_week(timestamp) == iso_week(now)
}

/// Monday 00:00 UTC of the week containing `now`.
pub fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let day = now.date_naive();
    let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    midnight(monday)
}

/// Lower bound of the four-week window: the start of the current week minus three weeks.
pub fn four_week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of_week(now) - Duration::days(LOOKBACK_DAYS)
}

pub fn in_four_week_window(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    timestamp >= four_week_start(now) && timestamp <= now
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn same_week_from_monday_to_sunday() {
        let now = at(2024, 3, 13, 12);
        assert!(is_this_week(at(2024, 3, 11, 0), now));
        assert!(is_this_week(at(2024, 3, 17, 23), now));
        assert!(!is_this_week(at(2024, 3, 10, 23), now));
        assert!(!is_this_week(at(2024, 3, 18, 0), now));
    }

    #[test]
    fn a_week_before_the_start_is_never_this_week() {
        let now = at(2024, 3, 13, 12);
        let start = start_of_week(now);
        for offset in 7..60 {
            assert!(!is_this_week(start - Duration::days(offset), now));
        }
    }

    #[test]
    fn agrees_with_chrono_iso_weeks() {
        let mut day = at(2019, 12, 1, 6);
        while day < at(2027, 2, 1, 0) {
            let iso = day.iso_week();
            assert_eq!(iso_week(day), (iso.year(), iso.week()), "{day}");
            day += Duration::days(1);
        }
    }

    #[test]
    fn year_boundaries_follow_the_thursday() {
        assert_eq!(iso_week(at(2021, 1, 1, 0)), (2020, 53));
        assert_eq!(iso_week(at(2024, 12, 30, 0)), (2025, 1));
        assert!(is_this_week(at(2024, 12, 30, 9), at(2025, 1, 2, 9)));
    }

    #[test]
    fn four_week_window_starts_three_weeks_before_this_monday() {
        let now = at(2024, 3, 13, 12);
        assert_eq!(start_of_week(now), at(2024, 3, 11, 0));
        assert_eq!(four_week_start(now), at(2024, 2, 19, 0));
        assert!(in_four_week_window(at(2024, 2, 19, 0), now));
        assert!(!in_four_week_window(at(2024, 2, 18, 23), now));
        assert!(!in_four_week_window(at(2024, 3, 14, 0), now));
    }
}
