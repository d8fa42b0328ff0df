//! Booking transaction: book, reschedule, cancel, outcomes and reminders
//!
//! The Booking and CalendarEvent writes are the operation of record and
//! go through the store atomically. Everything after them (lead upsert,
//! audit trail, notifications, reminder records) is best-effort: failures
//! are logged and the operation still succeeds.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{
    assignment::AssignmentService,
    availability::{AvailabilityService, Exclusion},
    clock::Clock,
    history::HistoryLog,
    notifications::Notifier,
    qualification::disqualification_reason,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{
            Booking, BookingConfirmation, BookingRequest, BookingStatus, CancelRequest, MeetingOutcome,
            NewBooking, OutcomeRequest, RescheduleRequest,
        },
        booking_link::BookingLink,
        history::{HistoryEvent, HistoryKind},
        lead::NewLead,
        reminder::{NewReminder, ReminderStatus},
    },
    repository::SchedulingStore,
    scheduling::time::parse_timezone,
};

/// Reminders handled per dispatch run
const REMINDER_BATCH: i64 = 100;

/// Log a failed side effect and carry on
fn best_effort<T>(what: &str, result: AppResult<T>) {
    if let Err(err) = result {
        if err.is_not_provisioned() {
            tracing::debug!("Skipping {}: {}", what, err);
        } else {
            tracing::warn!("Failed to {}: {}", what, err);
        }
    }
}

fn slot_taken() -> AppError {
    AppError::SlotNoLongerAvailable("The selected time is no longer available".to_string())
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    availability: AvailabilityService,
    assignment: AssignmentService,
    notifier: Arc<dyn Notifier>,
    history: Arc<dyn HistoryLog>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        availability: AvailabilityService,
        assignment: AssignmentService,
        notifier: Arc<dyn Notifier>,
        history: Arc<dyn HistoryLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            availability,
            assignment,
            notifier,
            history,
            clock,
        }
    }

    /// Book a slot on `link`
    pub async fn book_slot(&self, link: &BookingLink, request: BookingRequest) -> AppResult<BookingConfirmation> {
        request.validate()?;
        let tz = parse_timezone(&request.timezone)?;

        self.check_lead(link, &request).await?;

        if link.prevent_duplicate_bookings {
            if let Some(existing) = self
                .store
                .find_live_booking_by_email(link.id, &request.email)
                .await?
            {
                return Err(AppError::Conflict(format!(
                    "{} already has a booking on this link ({})",
                    request.email, existing.id
                )));
            }
        }

        let slot = self
            .availability
            .find_slot(link, request.start_time, tz, Exclusion::default())
            .await?
            .ok_or_else(slot_taken)?;

        let roster = self.availability.roster(link).await?;
        let mut candidates = self.assignment.candidates(link, &roster, &request.form_responses);
        if let Some(host) = request.assigned_host_id {
            // A preset host must be one assignment could have picked
            if !candidates.contains(&host) {
                return Err(AppError::Validation(format!(
                    "Host {} does not take bookings on this link",
                    host
                )));
            }
            candidates = vec![host];
        }
        let free = self
            .availability
            .free_hosts_at(link, &slot, &candidates, Exclusion::default())
            .await?;

        let host = match request.assigned_host_id {
            Some(host) => free.contains(&host).then_some(host),
            None => {
                self.assignment
                    .assign(link, &roster, &request.form_responses, |h| free.contains(&h))
                    .await?
            }
        }
        .ok_or_else(slot_taken)?;

        let (booking, calendar_event) = self
            .store
            .create_booking(NewBooking {
                booking_link_id: link.id,
                lead_id: request.lead_id,
                assigned_host_id: host,
                scheduled_start: slot.start,
                scheduled_end: slot.end,
                timezone: request.timezone.clone(),
                invitee_name: request.name.clone(),
                invitee_email: request.email.clone(),
                event_title: format!("{} with {}", link.name, request.name),
            })
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            link_id = %link.id,
            host = %host,
            start = %booking.scheduled_start,
            "booking created"
        );

        best_effort(
            "upsert lead",
            self.store
                .upsert_lead(NewLead {
                    booking_link_id: link.id,
                    name: request.name,
                    email: request.email,
                    phone: request.phone,
                    company: request.company,
                    country_code: request.country_code,
                    form_responses: request.form_responses,
                    qualified: true,
                    disqualification_reason: None,
                    last_booking_id: Some(booking.id),
                })
                .await,
        );
        self.record(HistoryKind::BookingCreated, &booking, None, serde_json::json!({
            "assigned_host_id": host,
            "scheduled_start": booking.scheduled_start,
        }))
        .await;
        if link.notifications.send_confirmation_email {
            best_effort(
                "send confirmation",
                self.notifier.send_confirmation(link, &booking).await,
            );
        }
        self.schedule_reminders(link, &booking).await;

        Ok(BookingConfirmation {
            booking,
            calendar_event,
        })
    }

    /// Move a live booking to a new slot on the same link, same host
    pub async fn reschedule_booking(&self, id: Uuid, request: RescheduleRequest) -> AppResult<BookingConfirmation> {
        let tz = parse_timezone(&request.timezone)?;
        let current = self.store.get_booking(id).await?;
        if !current.status.is_live() {
            return Err(AppError::Conflict(format!(
                "Booking {} cannot be rescheduled from status {:?}",
                id, current.status
            )));
        }

        let link = self.store.get_booking_link(current.booking_link_id).await?;
        if !link.allow_reschedule {
            return Err(AppError::BusinessRule(
                "This booking link does not allow rescheduling".to_string(),
            ));
        }

        // The booking must not collide with itself
        let exclude = Exclusion {
            event_id: Some(current.calendar_event_id),
            booking_id: Some(current.id),
        };
        let slot = self
            .availability
            .find_slot(&link, request.new_start, tz, exclude)
            .await?
            .ok_or_else(slot_taken)?;
        let free = self
            .availability
            .free_hosts_at(&link, &slot, &[current.assigned_host_id], exclude)
            .await?;
        if free.is_empty() {
            return Err(slot_taken());
        }

        let (booking, calendar_event) = self
            .store
            .reschedule_booking(id, slot.start, slot.end, &request.timezone)
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            from = %current.scheduled_start,
            to = %booking.scheduled_start,
            "booking rescheduled"
        );

        self.record(HistoryKind::BookingRescheduled, &booking, None, serde_json::json!({
            "previous_start": current.scheduled_start,
            "new_start": booking.scheduled_start,
        }))
        .await;
        best_effort(
            "send reschedule notice",
            self.notifier
                .send_reschedule(&link, &booking, current.scheduled_start)
                .await,
        );
        self.schedule_reminders(&link, &booking).await;

        Ok(BookingConfirmation {
            booking,
            calendar_event,
        })
    }

    /// Cancel a booking, its calendar event and its pending reminders
    pub async fn cancel_booking(&self, id: Uuid, request: CancelRequest) -> AppResult<Booking> {
        request.validate()?;
        let current = self.store.get_booking(id).await?;
        if current.status == BookingStatus::Cancelled {
            return Err(AppError::Conflict(format!("Booking {} is already cancelled", id)));
        }

        let (booking, _) = self
            .store
            .cancel_booking(id, request.reason.as_deref(), &request.cancelled_by)
            .await?;

        tracing::info!(booking_id = %booking.id, cancelled_by = %request.cancelled_by, "booking cancelled");

        self.record(
            HistoryKind::BookingCancelled,
            &booking,
            Some(request.cancelled_by),
            serde_json::json!({ "reason": request.reason }),
        )
        .await;
        match self.store.get_booking_link(booking.booking_link_id).await {
            Ok(link) => best_effort(
                "send cancellation notice",
                self.notifier.send_cancellation(&link, &booking).await,
            ),
            Err(e) => best_effort::<()>("load link for cancellation notice", Err(e)),
        }

        Ok(booking)
    }

    /// Mark a past meeting completed or no-show
    pub async fn record_outcome(&self, id: Uuid, request: OutcomeRequest) -> AppResult<Booking> {
        let current = self.store.get_booking(id).await?;
        if current.status == BookingStatus::Cancelled {
            return Err(AppError::Conflict(format!("Booking {} is cancelled", id)));
        }
        if current.scheduled_start > self.clock.now() {
            return Err(AppError::BusinessRule(
                "An outcome can only be recorded once the meeting has started".to_string(),
            ));
        }

        let status = match request.outcome {
            MeetingOutcome::Completed => BookingStatus::Completed,
            MeetingOutcome::NoShow => BookingStatus::NoShow,
        };
        // A no-show cannot close a deal
        let closed_won = request.closed_won && status == BookingStatus::Completed;

        let booking = self.store.set_booking_outcome(id, status, closed_won).await?;
        self.record(HistoryKind::BookingOutcome, &booking, None, serde_json::json!({
            "status": booking.status,
            "closed_won": booking.closed_won,
        }))
        .await;
        Ok(booking)
    }

    /// Send every pending reminder due at `now`; returns how many went out
    pub async fn dispatch_due_reminders(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let due = self.store.due_reminders(now, REMINDER_BATCH).await?;
        let mut sent = 0;

        for reminder in due {
            let booking = match self.store.get_booking(reminder.booking_id).await {
                Ok(booking) => booking,
                Err(AppError::NotFound(_)) => {
                    self.store
                        .mark_reminder(reminder.id, ReminderStatus::Cancelled, now)
                        .await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !booking.status.is_live() || booking.scheduled_start <= now {
                self.store
                    .mark_reminder(reminder.id, ReminderStatus::Cancelled, now)
                    .await?;
                continue;
            }

            match self.notifier.send_reminder(&booking, &reminder).await {
                Ok(()) => {
                    self.store.mark_reminder(reminder.id, ReminderStatus::Sent, now).await?;
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!(reminder_id = %reminder.id, "Failed to send reminder: {}", e);
                    self.store.mark_reminder(reminder.id, ReminderStatus::Failed, now).await?;
                }
            }
        }

        if sent > 0 {
            tracing::info!(sent, "reminders dispatched");
        }
        Ok(sent)
    }

    /// Fail fast when the request names a lead that may not book, or
    /// when the answers themselves disqualify it
    async fn check_lead(&self, link: &BookingLink, request: &BookingRequest) -> AppResult<()> {
        if let Some(lead_id) = request.lead_id {
            let lead = self.store.get_lead(lead_id).await?;
            if lead.booking_link_id != link.id {
                return Err(AppError::Validation(format!(
                    "Lead {} does not belong to this booking link",
                    lead_id
                )));
            }
            if !lead.qualified {
                return Err(AppError::LeadDisqualified(
                    lead.disqualification_reason
                        .unwrap_or_else(|| "Lead is not qualified".to_string()),
                ));
            }
        }

        if let Some(reason) = disqualification_reason(
            link,
            &request.email,
            request.country_code.as_deref(),
            &request.form_responses,
        ) {
            best_effort(
                "persist disqualified lead",
                self.store
                    .upsert_lead(NewLead {
                        booking_link_id: link.id,
                        name: request.name.clone(),
                        email: request.email.clone(),
                        phone: request.phone.clone(),
                        company: request.company.clone(),
                        country_code: request.country_code.clone(),
                        form_responses: request.form_responses.clone(),
                        qualified: false,
                        disqualification_reason: Some(reason.clone()),
                        last_booking_id: None,
                    })
                    .await,
            );
            return Err(AppError::LeadDisqualified(reason));
        }
        Ok(())
    }

    async fn schedule_reminders(&self, link: &BookingLink, booking: &Booking) {
        if !link.notifications.send_reminders {
            return;
        }
        let now = self.clock.now();
        let reminders: Vec<NewReminder> = link
            .notifications
            .reminder_offsets_minutes
            .iter()
            .filter(|offset| **offset > 0)
            .map(|offset| NewReminder {
                booking_id: booking.id,
                remind_at: booking.scheduled_start - Duration::minutes(*offset),
                offset_minutes: *offset,
            })
            .filter(|reminder| reminder.remind_at > now)
            .collect();

        if !reminders.is_empty() {
            best_effort(
                "schedule reminders",
                self.store.insert_reminders(reminders).await,
            );
        }
    }

    async fn record(&self, kind: HistoryKind, booking: &Booking, actor: Option<String>, details: serde_json::Value) {
        let event = HistoryEvent {
            kind,
            booking_link_id: booking.booking_link_id,
            booking_id: Some(booking.id),
            actor,
            details,
            occurred_at: self.clock.now(),
        };
        best_effort("record history event", self.history.record(event).await);
    }
}
