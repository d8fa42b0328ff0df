//! Calendar events, busy intervals and candidate slots

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
    Declined,
}

impl EventStatus {
    /// Cancelled and declined events never block a slot
    pub fn is_busy(&self) -> bool {
        !matches!(self, EventStatus::Cancelled | EventStatus::Declined)
    }
}

/// Calendar event owned by a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub booking_link_id: Option<Uuid>,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Time a host is already committed, as seen by availability queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BusyInterval {
    pub host_user_id: Uuid,
    pub event_id: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: EventStatus,
}

impl BusyInterval {
    pub fn new(host_user_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            host_user_id,
            event_id: None,
            start,
            end,
            status: EventStatus::Confirmed,
        }
    }
}

impl From<&CalendarEvent> for BusyInterval {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            host_user_id: event.owner_id,
            event_id: Some(event.id),
            start: event.start_time,
            end: event.end_time,
            status: event.status,
        }
    }
}

/// A bookable time; carries no host information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA timezone the slot was generated in
    pub timezone: String,
}

/// Working hours for one day, in local wall time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse `HH:MM` bounds
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start: NaiveTime::parse_from_str(start, "%H:%M")?,
            end: NaiveTime::parse_from_str(end, "%H:%M")?,
        })
    }
}
