//! Business logic services
//!
//! Services receive their collaborators at construction; nothing here
//! reaches for global state.

pub mod analytics;
pub mod assignment;
pub mod availability;
pub mod bookings;
pub mod clock;
pub mod history;
pub mod notifications;
pub mod qualification;

use std::sync::Arc;

use crate::{
    config::SchedulingConfig, repository::SchedulingStore, scheduling::WorkingHoursProvider,
};

use self::{clock::Clock, history::HistoryLog, notifications::Notifier};

/// External collaborators shared by every service
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn SchedulingStore>,
    pub working_hours: Arc<dyn WorkingHoursProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub history: Arc<dyn HistoryLog>,
    pub clock: Arc<dyn Clock>,
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn SchedulingStore>,
    pub availability: availability::AvailabilityService,
    pub assignment: assignment::AssignmentService,
    pub qualification: qualification::QualificationService,
    pub bookings: bookings::BookingService,
    pub analytics: analytics::AnalyticsService,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Create all services around the given collaborators
    pub fn new(collaborators: Collaborators, scheduling: &SchedulingConfig) -> Self {
        let Collaborators {
            store,
            working_hours,
            notifier,
            history,
            clock,
        } = collaborators;

        let availability = availability::AvailabilityService::new(
            store.clone(),
            working_hours,
            clock.clone(),
            scheduling.calendar_max_days,
        );
        let assignment = assignment::AssignmentService::new(store.clone(), clock.clone());

        Self {
            qualification: qualification::QualificationService::new(
                store.clone(),
                history.clone(),
                clock.clone(),
            ),
            bookings: bookings::BookingService::new(
                store.clone(),
                availability.clone(),
                assignment.clone(),
                notifier,
                history,
                clock.clone(),
            ),
            analytics: analytics::AnalyticsService::new(store.clone()),
            availability,
            assignment,
            store,
            clock,
        }
    }
}
