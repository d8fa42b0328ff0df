//! Aggregate booking statistics for a link

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookingAnalytics {
    pub booking_link_id: Uuid,
    pub total: usize,
    pub scheduled: usize,
    pub rescheduled: usize,
    pub completed: usize,
    pub no_show: usize,
    pub cancelled: usize,
    pub closed_won: usize,
    pub leads: usize,
    pub qualified_leads: usize,
    /// completed / (completed + no_show)
    pub show_rate: Option<f64>,
    /// closed_won / completed
    pub close_rate: Option<f64>,
    /// qualified leads / leads
    pub qualification_rate: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AnalyticsQuery {
    /// Only bookings scheduled at or after this instant (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Only bookings scheduled before this instant (RFC 3339)
    pub to: Option<DateTime<Utc>>,
}
