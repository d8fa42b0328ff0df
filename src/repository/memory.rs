//! In-process record store
//!
//! Holds all state behind one async mutex, so every multi-record write is
//! atomic and the live-booking uniqueness check cannot race. Used by the
//! test suites and by `database.backend = "memory"` for local runs.

use std::{
    cmp::Reverse,
    collections::{HashMap, VecDeque},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::SchedulingStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingStatus, NewBooking},
        booking_link::{BookingLink, LinkHost},
        calendar::{BusyInterval, CalendarEvent, EventStatus},
        history::HistoryEvent,
        lead::{Lead, NewLead},
        reminder::{NewReminder, Reminder, ReminderStatus},
    },
    services::history::HistoryLog,
};

#[derive(Default)]
struct State {
    links: HashMap<Uuid, BookingLink>,
    hosts: HashMap<Uuid, Vec<LinkHost>>,
    events: HashMap<Uuid, CalendarEvent>,
    /// Creation order
    bookings: Vec<Booking>,
    leads: Vec<Lead>,
    reminders: Vec<Reminder>,
    /// Most recent events only
    history: VecDeque<HistoryEvent>,
}

impl State {
    fn booking_mut(&mut self, id: Uuid) -> AppResult<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    fn host_slot_taken(&self, host: Uuid, start: DateTime<Utc>, except: Option<Uuid>) -> bool {
        self.bookings.iter().any(|b| {
            b.assigned_host_id == host
                && b.scheduled_start == start
                && b.status != BookingStatus::Cancelled
                && Some(b.id) != except
        })
    }

    fn cancel_pending_reminders(&mut self, booking_id: Uuid) {
        for reminder in self
            .reminders
            .iter_mut()
            .filter(|r| r.booking_id == booking_id && r.status == ReminderStatus::Pending)
        {
            reminder.status = ReminderStatus::Cancelled;
        }
    }
}

/// History events kept in memory before the oldest are dropped
const HISTORY_LIMIT: usize = 10_000;

pub struct MemoryStore {
    state: Mutex<State>,
    history_limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_history_limit(HISTORY_LIMIT)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            history_limit,
        }
    }

    /// Register a booking link and its roster
    pub async fn insert_link(&self, link: BookingLink, hosts: Vec<LinkHost>) {
        let mut state = self.state.lock().await;
        state.hosts.insert(link.id, hosts);
        state.links.insert(link.id, link);
    }

    /// Add an event to a host's calendar
    pub async fn insert_event(&self, event: CalendarEvent) {
        self.state.lock().await.events.insert(event.id, event);
    }

    /// Add a confirmed event blocking `[start, end)` for `host`
    pub async fn block_time(&self, host: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Uuid {
        let now = Utc::now();
        let event = CalendarEvent {
            id: Uuid::new_v4(),
            owner_id: host,
            booking_link_id: None,
            title: "Busy".to_string(),
            start_time: start,
            end_time: end,
            status: EventStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        let id = event.id;
        self.insert_event(event).await;
        id
    }

    pub async fn reminders_for(&self, booking_id: Uuid) -> Vec<Reminder> {
        let state = self.state.lock().await;
        state
            .reminders
            .iter()
            .filter(|r| r.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub async fn history(&self) -> Vec<HistoryEvent> {
        self.state.lock().await.history.iter().cloned().collect()
    }
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn get_booking_link(&self, id: Uuid) -> AppResult<BookingLink> {
        let state = self.state.lock().await;
        state
            .links
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking link {} not found", id)))
    }

    async fn list_link_hosts(&self, link_id: Uuid) -> AppResult<Vec<LinkHost>> {
        let state = self.state.lock().await;
        let mut hosts = state.hosts.get(&link_id).cloned().unwrap_or_default();
        hosts.sort_by_key(|h| (Reverse(h.priority), h.user_id));
        Ok(hosts)
    }

    async fn list_busy_intervals(
        &self,
        host_ids: &[Uuid],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BusyInterval>> {
        let state = self.state.lock().await;
        let mut busy: Vec<BusyInterval> = state
            .events
            .values()
            .filter(|e| host_ids.contains(&e.owner_id))
            .filter(|e| e.status.is_busy())
            .filter(|e| e.start_time < to && e.end_time > from)
            .map(BusyInterval::from)
            .collect();
        busy.sort_by_key(|b| b.start);
        Ok(busy)
    }

    async fn get_calendar_event(&self, id: Uuid) -> AppResult<CalendarEvent> {
        let state = self.state.lock().await;
        state
            .events
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Calendar event {} not found", id)))
    }

    async fn get_booking(&self, id: Uuid) -> AppResult<Booking> {
        let state = self.state.lock().await;
        state
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    async fn list_bookings(
        &self,
        link_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| b.booking_link_id == link_id)
            .filter(|b| from.map_or(true, |f| b.scheduled_start >= f))
            .filter(|b| to.map_or(true, |t| b.scheduled_start < t))
            .cloned()
            .collect())
    }

    async fn count_active_bookings(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_booking: Option<Uuid>,
    ) -> AppResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .bookings
            .iter()
            .filter(|b| b.booking_link_id == link_id)
            .filter(|b| b.status != BookingStatus::Cancelled)
            .filter(|b| b.scheduled_start >= from && b.scheduled_start < to)
            .filter(|b| Some(b.id) != exclude_booking)
            .count();
        Ok(count as i64)
    }

    async fn latest_booking(&self, link_id: Uuid) -> AppResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .rev()
            .find(|b| b.booking_link_id == link_id)
            .cloned())
    }

    async fn count_bookings_by_host(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<HashMap<Uuid, i64>> {
        let state = self.state.lock().await;
        let mut counts = HashMap::new();
        for booking in state
            .bookings
            .iter()
            .filter(|b| b.booking_link_id == link_id)
            .filter(|b| b.status != BookingStatus::Cancelled)
            .filter(|b| b.scheduled_start >= from && b.scheduled_start < to)
        {
            *counts.entry(booking.assigned_host_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn find_live_booking_by_email(&self, link_id: Uuid, email: &str) -> AppResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .rev()
            .find(|b| {
                b.booking_link_id == link_id
                    && b.status.is_live()
                    && b.invitee_email.eq_ignore_ascii_case(email)
            })
            .cloned())
    }

    async fn create_booking(&self, data: NewBooking) -> AppResult<(Booking, CalendarEvent)> {
        let mut state = self.state.lock().await;
        if state.host_slot_taken(data.assigned_host_id, data.scheduled_start, None) {
            return Err(AppError::SlotNoLongerAvailable(
                "The host already has a booking at this time".to_string(),
            ));
        }

        let now = Utc::now();
        let event = CalendarEvent {
            id: Uuid::new_v4(),
            owner_id: data.assigned_host_id,
            booking_link_id: Some(data.booking_link_id),
            title: data.event_title,
            start_time: data.scheduled_start,
            end_time: data.scheduled_end,
            status: EventStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        let booking = Booking {
            id: Uuid::new_v4(),
            booking_link_id: data.booking_link_id,
            lead_id: data.lead_id,
            assigned_host_id: data.assigned_host_id,
            calendar_event_id: event.id,
            scheduled_start: data.scheduled_start,
            scheduled_end: data.scheduled_end,
            timezone: data.timezone,
            status: BookingStatus::Scheduled,
            invitee_name: data.invitee_name,
            invitee_email: data.invitee_email,
            qualified: true,
            disqualification_reason: None,
            cancellation_reason: None,
            cancelled_by: None,
            closed_won: false,
            created_at: now,
            updated_at: now,
        };

        state.events.insert(event.id, event.clone());
        state.bookings.push(booking.clone());
        Ok((booking, event))
    }

    async fn reschedule_booking(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: &str,
    ) -> AppResult<(Booking, CalendarEvent)> {
        let mut state = self.state.lock().await;
        let current = state.booking_mut(id)?.clone();
        if !current.status.is_live() {
            return Err(AppError::Conflict(format!("Booking {} is not active", id)));
        }
        if state.host_slot_taken(current.assigned_host_id, start, Some(id)) {
            return Err(AppError::SlotNoLongerAvailable(
                "The host already has a booking at this time".to_string(),
            ));
        }

        let now = Utc::now();
        let event = {
            let event = state
                .events
                .get_mut(&current.calendar_event_id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Calendar event {} not found", current.calendar_event_id))
                })?;
            event.start_time = start;
            event.end_time = end;
            event.updated_at = now;
            event.clone()
        };
        let booking = {
            let booking = state.booking_mut(id)?;
            booking.scheduled_start = start;
            booking.scheduled_end = end;
            booking.timezone = timezone.to_string();
            booking.status = BookingStatus::Rescheduled;
            booking.updated_at = now;
            booking.clone()
        };
        state.cancel_pending_reminders(id);
        Ok((booking, event))
    }

    async fn cancel_booking(
        &self,
        id: Uuid,
        reason: Option<&str>,
        cancelled_by: &str,
    ) -> AppResult<(Booking, CalendarEvent)> {
        let mut state = self.state.lock().await;
        let current = state.booking_mut(id)?.clone();
        if current.status == BookingStatus::Cancelled {
            return Err(AppError::Conflict(format!("Booking {} is already cancelled", id)));
        }

        let now = Utc::now();
        let event = match state.events.get_mut(&current.calendar_event_id) {
            Some(event) => {
                event.status = EventStatus::Cancelled;
                event.updated_at = now;
                event.clone()
            }
            None => {
                return Err(AppError::NotFound(format!(
                    "Calendar event {} not found",
                    current.calendar_event_id
                )))
            }
        };
        let booking = {
            let booking = state.booking_mut(id)?;
            booking.status = BookingStatus::Cancelled;
            booking.cancellation_reason = reason.map(str::to_string);
            booking.cancelled_by = Some(cancelled_by.to_string());
            booking.updated_at = now;
            booking.clone()
        };
        state.cancel_pending_reminders(id);
        Ok((booking, event))
    }

    async fn set_booking_outcome(&self, id: Uuid, status: BookingStatus, closed_won: bool) -> AppResult<Booking> {
        let mut state = self.state.lock().await;
        let booking = state.booking_mut(id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::Conflict(format!("Booking {} is cancelled or missing", id)));
        }
        booking.status = status;
        booking.closed_won = closed_won;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn get_lead(&self, id: Uuid) -> AppResult<Lead> {
        let state = self.state.lock().await;
        state
            .leads
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }

    async fn upsert_lead(&self, data: NewLead) -> AppResult<Lead> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(lead) = state.leads.iter_mut().find(|l| {
            l.booking_link_id == data.booking_link_id && l.email.eq_ignore_ascii_case(&data.email)
        }) {
            lead.name = data.name;
            lead.phone = data.phone.or(lead.phone.take());
            lead.company = data.company.or(lead.company.take());
            lead.country_code = data.country_code.or(lead.country_code.take());
            lead.form_responses.extend(data.form_responses);
            lead.qualified = data.qualified;
            lead.disqualification_reason = data.disqualification_reason;
            lead.last_booking_id = data.last_booking_id.or(lead.last_booking_id);
            lead.updated_at = now;
            return Ok(lead.clone());
        }

        let lead = Lead {
            id: Uuid::new_v4(),
            booking_link_id: data.booking_link_id,
            name: data.name,
            email: data.email,
            phone: data.phone,
            company: data.company,
            country_code: data.country_code,
            form_responses: data.form_responses,
            qualified: data.qualified,
            disqualification_reason: data.disqualification_reason,
            last_booking_id: data.last_booking_id,
            created_at: now,
            updated_at: now,
        };
        state.leads.push(lead.clone());
        Ok(lead)
    }

    async fn list_leads(&self, link_id: Uuid) -> AppResult<Vec<Lead>> {
        let state = self.state.lock().await;
        Ok(state
            .leads
            .iter()
            .filter(|l| l.booking_link_id == link_id)
            .cloned()
            .collect())
    }

    async fn insert_reminders(&self, reminders: Vec<NewReminder>) -> AppResult<Vec<Reminder>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let created: Vec<Reminder> = reminders
            .into_iter()
            .map(|r| Reminder {
                id: Uuid::new_v4(),
                booking_id: r.booking_id,
                remind_at: r.remind_at,
                offset_minutes: r.offset_minutes,
                status: ReminderStatus::Pending,
                sent_at: None,
                created_at: now,
            })
            .collect();
        state.reminders.extend(created.iter().cloned());
        Ok(created)
    }

    async fn due_reminders(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Reminder>> {
        let state = self.state.lock().await;
        let mut due: Vec<Reminder> = state
            .reminders
            .iter()
            .filter(|r| r.status == ReminderStatus::Pending && r.remind_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.remind_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn mark_reminder(&self, id: Uuid, status: ReminderStatus, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let reminder = state
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Reminder {} not found", id)))?;
        reminder.status = status;
        reminder.sent_at = (status == ReminderStatus::Sent).then_some(at);
        Ok(())
    }
}

#[async_trait]
impl HistoryLog for MemoryStore {
    async fn record(&self, event: HistoryEvent) -> AppResult<()> {
        tracing::info!(
            kind = event.kind.as_str(),
            booking_link_id = %event.booking_link_id,
            booking_id = ?event.booking_id,
            "history event"
        );
        if self.history_limit == 0 {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        if state.history.len() >= self.history_limit {
            state.history.pop_front();
        }
        state.history.push_back(event);
        Ok(())
    }
}
