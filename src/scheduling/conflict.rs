//! Calendar conflict detection
//!
//! A slot padded by its buffers conflicts with a busy interval when the two
//! half-open intervals overlap:
//!
//! ```text
//! slot.start - before < busy.end  &&  slot.end + after > busy.start
//! ```
//!
//! Touching intervals (one ends exactly when the other starts) never
//! conflict. Availability filtering and the booking-time check both go
//! through this module.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::calendar::{BusyInterval, CandidateSlot};

/// Padding around a meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffers {
    pub before: Duration,
    pub after: Duration,
}

impl Default for Buffers {
    fn default() -> Self {
        Self {
            before: Duration::zero(),
            after: Duration::zero(),
        }
    }
}

impl Buffers {
    pub fn from_minutes(before: i32, after: i32) -> Self {
        Self {
            before: Duration::minutes(before as i64),
            after: Duration::minutes(after as i64),
        }
    }

    /// The same padding seen from the other interval
    pub fn reversed(self) -> Self {
        Self {
            before: self.after,
            after: self.before,
        }
    }
}

/// Padded half-open overlap of `[a_start, a_end)` against `[b_start, b_end)`
pub fn padded_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
    buffers: Buffers,
) -> bool {
    a_start - buffers.before < b_end && a_end + buffers.after > b_start
}

/// Whether `slot` collides with `busy` once buffers are applied
pub fn conflicts(slot: &CandidateSlot, buffers: Buffers, busy: &BusyInterval) -> bool {
    busy.status.is_busy() && padded_overlap(slot.start, slot.end, busy.start, busy.end, buffers)
}

/// Whether a host is free for `slot`, given that host's busy intervals
pub fn host_is_free(slot: &CandidateSlot, buffers: Buffers, busy: &[BusyInterval]) -> bool {
    !busy.iter().any(|interval| conflicts(slot, buffers, interval))
}

/// Hosts (in roster order) free for `slot`; `busy` may hold intervals of any host
pub fn free_hosts(
    slot: &CandidateSlot,
    buffers: Buffers,
    hosts: &[Uuid],
    busy: &[BusyInterval],
) -> Vec<Uuid> {
    hosts
        .iter()
        .copied()
        .filter(|host| {
            !busy
                .iter()
                .filter(|interval| interval.host_user_id == *host)
                .any(|interval| conflicts(slot, buffers, interval))
        })
        .collect()
}

/// A slot is available when at least one roster host is free
pub fn any_host_free(
    slot: &CandidateSlot,
    buffers: Buffers,
    hosts: &[Uuid],
    busy: &[BusyInterval],
) -> bool {
    hosts.iter().any(|host| {
        !busy
            .iter()
            .filter(|interval| interval.host_user_id == *host)
            .any(|interval| conflicts(slot, buffers, interval))
    })
}
