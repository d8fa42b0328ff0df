//! Pure scheduling logic
//!
//! Interval arithmetic, slot generation, booking-window rules and form rule
//! evaluation. Nothing in here touches the record store; the services layer
//! feeds it snapshots and acts on the results.

pub mod conflict;
pub mod date_range;
pub mod rules;
pub mod slots;
pub mod time;
pub mod working_hours;

pub use conflict::Buffers;
pub use working_hours::{StandardWorkingHours, WorkingHoursProvider};
