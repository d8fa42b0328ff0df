//! Audit trail entries emitted by the booking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    BookingCreated,
    BookingRescheduled,
    BookingCancelled,
    BookingOutcome,
    LeadDisqualified,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::BookingCreated => "booking_created",
            HistoryKind::BookingRescheduled => "booking_rescheduled",
            HistoryKind::BookingCancelled => "booking_cancelled",
            HistoryKind::BookingOutcome => "booking_outcome",
            HistoryKind::LeadDisqualified => "lead_disqualified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub kind: HistoryKind,
    pub booking_link_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub actor: Option<String>,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}
