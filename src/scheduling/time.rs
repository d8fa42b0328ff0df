//! Timezone and local-day helpers

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| AppError::InvalidDate(format!("Unknown timezone '{}'", name)))
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(format!("Invalid date '{}' (use YYYY-MM-DD)", value)))
}

/// Parse an RFC 3339 instant
pub fn parse_instant(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidDate(format!("Invalid timestamp '{}' (use RFC 3339)", value)))
}

/// Resolve a local wall time to an instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times
/// inside a DST gap do not exist and yield `None`.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Resolve a local boundary, such as a window end, to an instant.
///
/// A boundary inside a DST gap moves to the first wall time after the gap.
pub fn local_bound_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    (0..=96).find_map(|step| local_to_utc(tz, local + Duration::minutes(15 * step)))
}

/// Start of the local day as an instant
fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    // A few zones skip midnight on DST days; the first valid hour starts the day
    (0..=3)
        .find_map(|h| local_to_utc(tz, midnight + Duration::hours(h)))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// `[start, end)` of a local day in UTC
pub fn day_bounds(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(date);
    (start_of_day(tz, date), start_of_day(tz, next))
}

/// The local date of an instant
pub fn local_date(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("Europe/Paris").is_ok());
        assert!(matches!(parse_timezone("Mars/Olympus"), Err(AppError::InvalidDate(_))));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2026-02-30").is_err());
        assert!(parse_date("tomorrow").is_err());
        assert_eq!(
            parse_date("2026-03-02").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }

    #[test]
    fn test_day_bounds_follow_dst() {
        // Europe/Paris switches to summer time on 2026-03-29: that day has 23 hours
        let tz = parse_timezone("Europe/Paris").unwrap();
        let (start, end) = day_bounds(tz, NaiveDate::from_ymd_opt(2026, 3, 29).unwrap());
        assert_eq!(end - start, Duration::hours(23));
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 28, 23, 0, 0).unwrap());
    }

    #[test]
    fn test_gap_time_does_not_exist() {
        let tz = parse_timezone("Europe/Paris").unwrap();
        let gap = NaiveDate::from_ymd_opt(2026, 3, 29)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert!(local_to_utc(tz, gap).is_none());
    }
}
