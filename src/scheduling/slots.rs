//! Candidate slot generation for one local day

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;

use super::time::{local_bound_to_utc, local_to_utc};
use crate::{
    error::{AppError, AppResult},
    models::calendar::{CandidateSlot, WorkingWindow},
};

/// Generate the raw candidate slots of `date` in `tz`.
///
/// For each window a slot `[cursor, cursor + duration)` is emitted while it
/// fits before the window end, then the cursor advances by `increment`.
/// The result is ordered by start and holds each start instant once, so
/// overlapping windows never yield the same slot twice.
pub fn generate_slots(
    date: NaiveDate,
    tz: Tz,
    windows: &[WorkingWindow],
    duration_minutes: i32,
    increment_minutes: i32,
) -> AppResult<Vec<CandidateSlot>> {
    if increment_minutes <= 0 {
        return Err(AppError::InvalidConfiguration(format!(
            "start time increment must be positive (got {})",
            increment_minutes
        )));
    }
    if duration_minutes <= 0 {
        return Err(AppError::InvalidConfiguration(format!(
            "meeting duration must be positive (got {})",
            duration_minutes
        )));
    }

    let duration = Duration::minutes(duration_minutes as i64);
    let increment = Duration::minutes(increment_minutes as i64);
    let timezone = tz.name().to_string();
    let mut slots = Vec::new();

    for window in windows {
        let window_end = date.and_time(window.end);
        let Some(end_instant) = local_bound_to_utc(tz, window_end) else {
            continue;
        };
        let mut cursor = date.and_time(window.start);

        while cursor < window_end {
            // Wall times inside a DST gap are skipped; the fit is checked
            // on real instants since a slot may span the transition
            if let Some(start) = local_to_utc(tz, cursor) {
                if start + duration <= end_instant {
                    slots.push(CandidateSlot {
                        start,
                        end: start + duration,
                        timezone: timezone.clone(),
                    });
                }
            }
            cursor += increment;
        }
    }

    slots.sort_by_key(|slot| slot.start);
    slots.dedup_by_key(|slot| slot.start);
    Ok(slots)
}
