//! API handlers for the Meetlink REST endpoints
//!
//! Handlers are thin: they parse the request, resolve the booking link and
//! hand over to the services. Authentication happens upstream of this
//! server.

pub mod assignments;
pub mod booking_links;
pub mod bookings;
pub mod health;
pub mod openapi;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{error::AppResult, models::booking_link::BookingLink, AppState};

/// Load a booking link or fail with `NotFound`
pub(crate) async fn load_link(state: &AppState, id: Uuid) -> AppResult<BookingLink> {
    state.services.store.get_booking_link(id).await
}

/// Build the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Booking links
        .route("/booking-links/:id", get(booking_links::get_booking_link))
        .route("/booking-links/:id/slots", get(booking_links::list_slots))
        .route("/booking-links/:id/slots/check", get(booking_links::check_slot))
        .route("/booking-links/:id/calendar", get(booking_links::get_calendar))
        .route("/booking-links/:id/leads", post(booking_links::submit_lead))
        .route("/booking-links/:id/bookings", post(booking_links::create_booking))
        .route("/booking-links/:id/analytics", get(booking_links::get_analytics))
        // Bookings
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/reschedule", post(bookings::reschedule_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/bookings/:id/outcome", post(bookings::record_outcome))
        // Assignments
        .route("/assignments/preview", post(assignments::preview_assignment))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
