//! Data models for the scheduling core

pub mod analytics;
pub mod availability;
pub mod booking;
pub mod booking_link;
pub mod calendar;
pub mod history;
pub mod lead;
pub mod reminder;
pub mod rule;

// Re-export commonly used types
pub use analytics::BookingAnalytics;
pub use availability::{AvailableSlots, CalendarDay};
pub use booking::{Booking, BookingConfirmation, BookingRequest, BookingStatus, NewBooking};
pub use booking_link::{AssignmentType, BookingLink, DateRangeKind, DateRangePolicy, LinkHost};
pub use calendar::{BusyInterval, CalendarEvent, CandidateSlot, EventStatus, WorkingWindow};
pub use history::{HistoryEvent, HistoryKind};
pub use lead::{Lead, LeadSubmission, NewLead, QualificationResult};
pub use reminder::{NewReminder, Reminder, ReminderStatus};
pub use rule::{DisqualificationRule, FormResponses, RoutingRule, RuleOperator};
