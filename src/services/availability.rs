//! Availability engine
//!
//! Turns a booking link, a local date and a timezone into the list of
//! bookable slots. Every gate that rules a day out produces an empty result
//! with a message rather than an error; only unusable input (bad date,
//! unknown timezone, broken link configuration) and store failures are
//! errors.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use super::clock::Clock;
use crate::{
    error::{AppError, AppResult},
    models::{
        availability::{AvailableSlots, CalendarDay},
        booking_link::BookingLink,
        calendar::{BusyInterval, CandidateSlot},
    },
    repository::SchedulingStore,
    scheduling::{
        conflict::{self, Buffers},
        date_range,
        slots::generate_slots,
        time::{day_bounds, local_date, parse_date, parse_timezone},
        WorkingHoursProvider,
    },
};

pub const NO_AVAILABILITY: &str = "No availability on this date.";
pub const NO_HOSTS: &str = "No hosts available.";
pub const DAILY_LIMIT_REACHED: &str = "Daily booking limit reached";

/// Days listed by the availability calendar when the caller does not say
pub const DEFAULT_CALENDAR_DAYS: u32 = 7;

/// Records an existing booking ignores when it is checked against its link
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Exclusion {
    pub event_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
    working_hours: Arc<dyn WorkingHoursProvider>,
    clock: Arc<dyn Clock>,
    max_calendar_days: u32,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        working_hours: Arc<dyn WorkingHoursProvider>,
        clock: Arc<dyn Clock>,
        max_calendar_days: u32,
    ) -> Self {
        Self {
            store,
            working_hours,
            clock,
            max_calendar_days,
        }
    }

    /// Bookable slots of `link` on `date` (YYYY-MM-DD) in `timezone`
    pub async fn get_available_slots(
        &self,
        link: &BookingLink,
        date: &str,
        timezone: &str,
    ) -> AppResult<AvailableSlots> {
        let tz = parse_timezone(timezone)?;
        let date = parse_date(date)?;
        self.slots_for_day(link, date, tz, Exclusion::default()).await
    }

    /// Per-day slot counts over `days` consecutive days from `start_date`
    pub async fn get_availability_calendar(
        &self,
        link: &BookingLink,
        start_date: &str,
        timezone: &str,
        days: Option<u32>,
    ) -> AppResult<Vec<CalendarDay>> {
        let days = days.unwrap_or(DEFAULT_CALENDAR_DAYS);
        if days == 0 || days > self.max_calendar_days {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {}",
                self.max_calendar_days
            )));
        }
        let tz = parse_timezone(timezone)?;
        let start = parse_date(start_date)?;

        let mut calendar = Vec::with_capacity(days as usize);
        for date in start.iter_days().take(days as usize) {
            let day = self.slots_for_day(link, date, tz, Exclusion::default()).await?;
            calendar.push(CalendarDay {
                date,
                slots_available: day.slots.len(),
                has_availability: !day.slots.is_empty(),
            });
        }
        Ok(calendar)
    }

    /// Whether a slot starting exactly at `start` is currently offered
    pub async fn is_slot_available(
        &self,
        link: &BookingLink,
        start: DateTime<Utc>,
        timezone: &str,
    ) -> AppResult<bool> {
        let tz = parse_timezone(timezone)?;
        Ok(self
            .find_slot(link, start, tz, Exclusion::default())
            .await?
            .is_some())
    }

    /// The offered slot starting at `start`, if any
    pub(crate) async fn find_slot(
        &self,
        link: &BookingLink,
        start: DateTime<Utc>,
        tz: Tz,
        exclude: Exclusion,
    ) -> AppResult<Option<CandidateSlot>> {
        let day = self.slots_for_day(link, local_date(tz, start), tz, exclude).await?;
        Ok(day.slots.into_iter().find(|slot| slot.start == start))
    }

    /// Active roster in priority order; the owner alone when nobody is listed
    pub(crate) async fn roster(&self, link: &BookingLink) -> AppResult<Vec<Uuid>> {
        let hosts: Vec<Uuid> = self
            .store
            .list_link_hosts(link.id)
            .await?
            .into_iter()
            .filter(|host| host.is_active)
            .map(|host| host.user_id)
            .collect();

        if hosts.is_empty() {
            Ok(vec![link.owner_id])
        } else {
            Ok(hosts)
        }
    }

    /// Which of `hosts` (in the given order) are free for `slot`
    pub(crate) async fn free_hosts_at(
        &self,
        link: &BookingLink,
        slot: &CandidateSlot,
        hosts: &[Uuid],
        exclude: Exclusion,
    ) -> AppResult<Vec<Uuid>> {
        let buffers = Buffers::from_minutes(link.buffer_before, link.buffer_after);
        let busy = self
            .busy_intervals(hosts, slot.start, slot.end, buffers, exclude)
            .await?;
        Ok(conflict::free_hosts(slot, buffers, hosts, &busy))
    }

    async fn busy_intervals(
        &self,
        hosts: &[Uuid],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        buffers: Buffers,
        exclude: Exclusion,
    ) -> AppResult<Vec<BusyInterval>> {
        // Widen the window so buffers can reach events just outside it
        let busy = self
            .store
            .list_busy_intervals(hosts, from - buffers.before, to + buffers.after)
            .await?;
        Ok(busy
            .into_iter()
            .filter(|interval| exclude.event_id.is_none() || interval.event_id != exclude.event_id)
            .collect())
    }

    async fn slots_for_day(
        &self,
        link: &BookingLink,
        date: NaiveDate,
        tz: Tz,
        exclude: Exclusion,
    ) -> AppResult<AvailableSlots> {
        link.check_config()?;
        let timezone = tz.name();
        let now = self.clock.now();

        if let Err(reason) =
            date_range::check_date(date, tz, now, &link.date_range, link.min_notice_hours)
        {
            return Ok(AvailableSlots::empty(date, timezone, reason));
        }

        let windows = self.working_hours.working_hours(link, date).await?;
        if windows.is_empty() {
            return Ok(AvailableSlots::empty(date, timezone, NO_AVAILABILITY));
        }

        let hosts = self.roster(link).await?;
        if hosts.is_empty() {
            return Ok(AvailableSlots::empty(date, timezone, NO_HOSTS));
        }

        let candidates = generate_slots(
            date,
            tz,
            &windows,
            link.duration_minutes,
            link.start_time_increment,
        )?;

        let buffers = Buffers::from_minutes(link.buffer_before, link.buffer_after);
        let (day_start, day_end) = day_bounds(tz, date);
        let busy = self
            .busy_intervals(&hosts, day_start, day_end, buffers, exclude)
            .await?;

        let earliest = date_range::earliest_start(now, link.min_notice_hours);
        let mut slots: Vec<CandidateSlot> = candidates
            .into_iter()
            .filter(|slot| slot.start >= earliest)
            .filter(|slot| conflict::any_host_free(slot, buffers, &hosts, &busy))
            .collect();

        if let Some(limit) = link.max_bookings_per_day {
            let booked = self
                .store
                .count_active_bookings(link.id, day_start, day_end, exclude.booking_id)
                .await?;
            let remaining = (limit as i64 - booked).max(0) as usize;
            if remaining == 0 {
                return Ok(AvailableSlots::empty(date, timezone, DAILY_LIMIT_REACHED));
            }
            // Earliest slots are kept
            slots.truncate(remaining);
        }

        tracing::debug!(
            link_id = %link.id,
            %date,
            timezone,
            hosts = hosts.len(),
            slots = slots.len(),
            "computed availability"
        );

        Ok(AvailableSlots {
            date,
            timezone: timezone.to_string(),
            slots,
            hosts_available: hosts.len(),
            message: None,
        })
    }
}
