//! Minimum-notice and advance-booking window rules

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use super::time::{day_bounds, local_date};
use crate::models::booking_link::{DateRangeKind, DateRangePolicy};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Move forward from `from` until `n` weekdays have been counted.
///
/// `from` itself never counts; weekends are crossed without counting.
/// Any seven consecutive days hold five weekdays, so whole weeks are
/// skipped at once and the last stretch is walked so the result lands
/// on a weekday.
pub fn add_business_days(from: NaiveDate, n: u32) -> NaiveDate {
    let weeks = n.saturating_sub(1) / 5;
    let mut date = match from.checked_add_signed(Duration::weeks(i64::from(weeks))) {
        Some(date) => date,
        None => return NaiveDate::MAX,
    };
    let remaining = n - weeks * 5;
    let mut counted = 0;
    while counted < remaining {
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
        if is_business_day(date) {
            counted += 1;
        }
    }
    date
}

/// Last local date a link accepts bookings for
pub fn max_bookable_date(policy: &DateRangePolicy, today: NaiveDate) -> NaiveDate {
    let value = policy.value.max(0);
    match policy.kind {
        DateRangeKind::CalendarDays => today
            .checked_add_signed(Duration::days(value as i64))
            .unwrap_or(NaiveDate::MAX),
        DateRangeKind::BusinessDays => add_business_days(today, value as u32),
        DateRangeKind::Indefinite => today
            .checked_add_months(Months::new(12))
            .unwrap_or(NaiveDate::MAX),
    }
}

/// Earliest instant a meeting may start
pub fn earliest_start(now: DateTime<Utc>, min_notice_hours: i32) -> DateTime<Utc> {
    now + Duration::hours(min_notice_hours.max(0) as i64)
}

/// Check a requested local date against the booking window.
///
/// Returns a human-readable reason when the date cannot hold any slot.
pub fn check_date(
    date: NaiveDate,
    tz: Tz,
    now: DateTime<Utc>,
    policy: &DateRangePolicy,
    min_notice_hours: i32,
) -> Result<(), String> {
    let today = local_date(tz, now);
    if date < today {
        return Err("This date is in the past".to_string());
    }

    let (_, day_end) = day_bounds(tz, date);
    if day_end <= earliest_start(now, min_notice_hours) {
        return Err(format!(
            "Bookings require at least {} hours notice",
            min_notice_hours
        ));
    }

    let max_date = max_bookable_date(policy, today);
    if date > max_date {
        return Err(format!(
            "Bookings are only accepted until {}",
            max_date.format("%Y-%m-%d")
        ));
    }
    Ok(())
}
