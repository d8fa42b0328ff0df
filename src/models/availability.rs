//! Availability query results

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::calendar::CandidateSlot;

/// Bookable slots of one link on one day
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailableSlots {
    pub date: NaiveDate,
    pub timezone: String,
    pub slots: Vec<CandidateSlot>,
    /// Size of the effective host roster
    pub hosts_available: usize,
    /// Why the list is empty, when it is
    pub message: Option<String>,
}

impl AvailableSlots {
    pub(crate) fn empty(date: NaiveDate, timezone: &str, message: impl Into<String>) -> Self {
        Self {
            date,
            timezone: timezone.to_string(),
            slots: Vec::new(),
            hosts_available: 0,
            message: Some(message.into()),
        }
    }
}

/// One day of the availability calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub slots_available: usize,
    pub has_availability: bool,
}

/// Query parameters for slot listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SlotsQuery {
    /// Day to list (YYYY-MM-DD)
    pub date: String,
    /// IANA timezone, e.g. Europe/Paris
    pub timezone: String,
}

/// Query parameters for the availability calendar
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CalendarQuery {
    /// First day (YYYY-MM-DD)
    pub start_date: String,
    pub timezone: String,
    /// Number of days (default 7)
    pub days: Option<u32>,
}

/// Query parameters for a single slot check
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SlotCheckQuery {
    /// Slot start (RFC 3339)
    pub start: String,
    pub timezone: String,
}
