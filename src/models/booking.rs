//! Booking model and booking requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{calendar::CalendarEvent, rule::FormResponses};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Rescheduled,
    Completed,
    NoShow,
    Cancelled,
}

impl BookingStatus {
    /// Scheduled or rescheduled bookings still hold their slot
    pub fn is_live(&self) -> bool {
        matches!(self, BookingStatus::Scheduled | BookingStatus::Rescheduled)
    }
}

/// Committed booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub booking_link_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub assigned_host_id: Uuid,
    pub calendar_event_id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub timezone: String,
    pub status: BookingStatus,
    pub invitee_name: String,
    pub invitee_email: String,
    pub qualified: bool,
    pub disqualification_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<String>,
    /// Set when the meeting led to a won deal
    pub closed_won: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the store needs to write a booking and its calendar event
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_link_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub assigned_host_id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub timezone: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub event_title: String,
}

/// Public booking request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookingRequest {
    /// Slot start (must match an available slot exactly)
    pub start_time: DateTime<Utc>,
    /// IANA timezone of the invitee
    pub timezone: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// ISO 3166 alpha-2 country code
    #[validate(length(equal = 2, message = "Country code must be 2 letters"))]
    pub country_code: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_responses: FormResponses,
    /// Lead created by an earlier form submission
    pub lead_id: Option<Uuid>,
    /// Host fixed by an earlier qualification step; must be on the
    /// link's roster or a routing target the answers match
    pub assigned_host_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub calendar_event: CalendarEvent,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RescheduleRequest {
    pub new_start: DateTime<Utc>,
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CancelRequest {
    #[validate(length(max = 1000, message = "Reason is too long"))]
    pub reason: Option<String>,
    /// `invitee`, `host` or a user identifier
    #[validate(length(min = 1, message = "cancelled_by is required"))]
    pub cancelled_by: String,
}

/// Final state of a meeting that took place (or did not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MeetingOutcome {
    Completed,
    NoShow,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OutcomeRequest {
    pub outcome: MeetingOutcome,
    #[serde(default)]
    pub closed_won: bool,
}
