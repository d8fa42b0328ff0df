//! Record store used by the scheduling core
//!
//! [`SchedulingStore`] is the only way services reach persistent state.
//! [`Repository`] implements it on Postgres; [`memory::MemoryStore`] keeps
//! everything in process for tests and local runs.

pub mod bookings;
pub mod calendar;
pub mod history;
pub mod leads;
pub mod links;
pub mod memory;
pub mod reminders;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        booking::{Booking, BookingStatus, NewBooking},
        booking_link::{BookingLink, LinkHost},
        calendar::{BusyInterval, CalendarEvent},
        history::HistoryEvent,
        lead::{Lead, NewLead},
        reminder::{NewReminder, Reminder, ReminderStatus},
    },
    services::history::HistoryLog,
};

/// Reads and writes the scheduling core depends on.
///
/// Multi-record writes (`create_booking`, `reschedule_booking`,
/// `cancel_booking`) are atomic: either every record changes or none does.
/// `create_booking` and `reschedule_booking` fail with
/// `SlotNoLongerAvailable` when the host already holds a live booking
/// starting at the same instant.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn get_booking_link(&self, id: Uuid) -> AppResult<BookingLink>;

    /// Roster in priority order
    async fn list_link_hosts(&self, link_id: Uuid) -> AppResult<Vec<LinkHost>>;

    /// Events of `host_ids` overlapping `[from, to)`, cancelled/declined excluded
    async fn list_busy_intervals(
        &self,
        host_ids: &[Uuid],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BusyInterval>>;

    async fn get_calendar_event(&self, id: Uuid) -> AppResult<CalendarEvent>;

    async fn get_booking(&self, id: Uuid) -> AppResult<Booking>;

    /// Bookings of a link scheduled within the optional bounds, oldest first
    async fn list_bookings(
        &self,
        link_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Booking>>;

    /// Non-cancelled bookings of a link starting in `[from, to)`
    async fn count_active_bookings(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_booking: Option<Uuid>,
    ) -> AppResult<i64>;

    /// Most recently created booking of a link, any status
    async fn latest_booking(&self, link_id: Uuid) -> AppResult<Option<Booking>>;

    /// Non-cancelled bookings per host starting in `[from, to)`
    async fn count_bookings_by_host(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<HashMap<Uuid, i64>>;

    /// A scheduled or rescheduled booking by this invitee email on the link
    async fn find_live_booking_by_email(&self, link_id: Uuid, email: &str) -> AppResult<Option<Booking>>;

    async fn create_booking(&self, booking: NewBooking) -> AppResult<(Booking, CalendarEvent)>;

    /// Move a booking and its event, and cancel its pending reminders
    async fn reschedule_booking(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: &str,
    ) -> AppResult<(Booking, CalendarEvent)>;

    /// Cancel a booking, its event and its pending reminders
    async fn cancel_booking(
        &self,
        id: Uuid,
        reason: Option<&str>,
        cancelled_by: &str,
    ) -> AppResult<(Booking, CalendarEvent)>;

    async fn set_booking_outcome(&self, id: Uuid, status: BookingStatus, closed_won: bool) -> AppResult<Booking>;

    async fn get_lead(&self, id: Uuid) -> AppResult<Lead>;

    /// Insert or update the lead keyed on (link, case-insensitive email)
    async fn upsert_lead(&self, lead: NewLead) -> AppResult<Lead>;

    async fn list_leads(&self, link_id: Uuid) -> AppResult<Vec<Lead>>;

    async fn insert_reminders(&self, reminders: Vec<NewReminder>) -> AppResult<Vec<Reminder>>;

    /// Pending reminders due at `now`, earliest first
    async fn due_reminders(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Reminder>>;

    async fn mark_reminder(&self, id: Uuid, status: ReminderStatus, at: DateTime<Utc>) -> AppResult<()>;
}

/// Postgres-backed store holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub links: links::LinksRepository,
    pub calendar: calendar::CalendarRepository,
    pub bookings: bookings::BookingsRepository,
    pub leads: leads::LeadsRepository,
    pub reminders: reminders::RemindersRepository,
    pub history: history::HistoryRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            links: links::LinksRepository::new(pool.clone()),
            calendar: calendar::CalendarRepository::new(pool.clone()),
            bookings: bookings::BookingsRepository::new(pool.clone()),
            leads: leads::LeadsRepository::new(pool.clone()),
            reminders: reminders::RemindersRepository::new(pool.clone()),
            history: history::HistoryRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl SchedulingStore for Repository {
    async fn get_booking_link(&self, id: Uuid) -> AppResult<BookingLink> {
        self.links.get_by_id(id).await
    }

    async fn list_link_hosts(&self, link_id: Uuid) -> AppResult<Vec<LinkHost>> {
        self.links.list_hosts(link_id).await
    }

    async fn list_busy_intervals(
        &self,
        host_ids: &[Uuid],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BusyInterval>> {
        self.calendar.list_busy(host_ids, from, to).await
    }

    async fn get_calendar_event(&self, id: Uuid) -> AppResult<CalendarEvent> {
        self.calendar.get_by_id(id).await
    }

    async fn get_booking(&self, id: Uuid) -> AppResult<Booking> {
        self.bookings.get_by_id(id).await
    }

    async fn list_bookings(
        &self,
        link_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Booking>> {
        self.bookings.list_for_link(link_id, from, to).await
    }

    async fn count_active_bookings(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_booking: Option<Uuid>,
    ) -> AppResult<i64> {
        self.bookings.count_active(link_id, from, to, exclude_booking).await
    }

    async fn latest_booking(&self, link_id: Uuid) -> AppResult<Option<Booking>> {
        self.bookings.latest_for_link(link_id).await
    }

    async fn count_bookings_by_host(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<HashMap<Uuid, i64>> {
        self.bookings.count_by_host(link_id, from, to).await
    }

    async fn find_live_booking_by_email(&self, link_id: Uuid, email: &str) -> AppResult<Option<Booking>> {
        self.bookings.find_live_by_email(link_id, email).await
    }

    async fn create_booking(&self, booking: NewBooking) -> AppResult<(Booking, CalendarEvent)> {
        self.bookings.create(&booking).await
    }

    async fn reschedule_booking(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: &str,
    ) -> AppResult<(Booking, CalendarEvent)> {
        self.bookings.reschedule(id, start, end, timezone).await
    }

    async fn cancel_booking(
        &self,
        id: Uuid,
        reason: Option<&str>,
        cancelled_by: &str,
    ) -> AppResult<(Booking, CalendarEvent)> {
        self.bookings.cancel(id, reason, cancelled_by).await
    }

    async fn set_booking_outcome(&self, id: Uuid, status: BookingStatus, closed_won: bool) -> AppResult<Booking> {
        self.bookings.set_outcome(id, status, closed_won).await
    }

    async fn get_lead(&self, id: Uuid) -> AppResult<Lead> {
        self.leads.get_by_id(id).await
    }

    async fn upsert_lead(&self, lead: NewLead) -> AppResult<Lead> {
        self.leads.upsert(&lead).await
    }

    async fn list_leads(&self, link_id: Uuid) -> AppResult<Vec<Lead>> {
        self.leads.list_for_link(link_id).await
    }

    async fn insert_reminders(&self, reminders: Vec<NewReminder>) -> AppResult<Vec<Reminder>> {
        self.reminders.insert_many(&reminders).await
    }

    async fn due_reminders(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Reminder>> {
        self.reminders.due(now, limit).await
    }

    async fn mark_reminder(&self, id: Uuid, status: ReminderStatus, at: DateTime<Utc>) -> AppResult<()> {
        self.reminders.mark(id, status, at).await
    }
}

#[async_trait]
impl HistoryLog for Repository {
    async fn record(&self, event: HistoryEvent) -> AppResult<()> {
        self.history.insert(&event).await
    }
}
