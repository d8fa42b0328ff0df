//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{assignments, booking_links, bookings, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Meetlink API",
        version = "1.0.0",
        description = "Booking-link scheduling and availability REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Booking links
        booking_links::get_booking_link,
        booking_links::list_slots,
        booking_links::get_calendar,
        booking_links::check_slot,
        booking_links::submit_lead,
        booking_links::create_booking,
        booking_links::get_analytics,
        // Bookings
        bookings::get_booking,
        bookings::reschedule_booking,
        bookings::cancel_booking,
        bookings::record_outcome,
        // Assignments
        assignments::preview_assignment,
    ),
    components(
        schemas(
            // Booking links
            crate::models::booking_link::BookingLink,
            crate::models::booking_link::LinkHost,
            crate::models::booking_link::DateRangePolicy,
            crate::models::booking_link::DateRangeKind,
            crate::models::booking_link::AssignmentType,
            crate::models::booking_link::QualificationSettings,
            crate::models::booking_link::NotificationSettings,
            crate::models::rule::DisqualificationRule,
            crate::models::rule::RoutingRule,
            crate::models::rule::RuleOperator,
            // Availability
            crate::models::availability::AvailableSlots,
            crate::models::availability::CalendarDay,
            crate::models::calendar::CandidateSlot,
            crate::models::calendar::CalendarEvent,
            crate::models::calendar::EventStatus,
            booking_links::SlotCheckResponse,
            // Leads
            crate::models::lead::LeadSubmission,
            crate::models::lead::QualificationResult,
            // Bookings
            crate::models::booking::Booking,
            crate::models::booking::BookingStatus,
            crate::models::booking::BookingRequest,
            crate::models::booking::BookingConfirmation,
            crate::models::booking::RescheduleRequest,
            crate::models::booking::CancelRequest,
            crate::models::booking::MeetingOutcome,
            crate::models::booking::OutcomeRequest,
            crate::models::analytics::BookingAnalytics,
            // Assignments
            assignments::AssignmentPreviewRequest,
            assignments::AssignmentPreviewResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "booking-links", description = "Availability, lead capture and booking"),
        (name = "bookings", description = "Booking lifecycle"),
        (name = "assignments", description = "Host assignment")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
