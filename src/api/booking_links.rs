//! Booking link endpoints: availability, lead capture, booking and analytics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        analytics::{AnalyticsQuery, BookingAnalytics},
        availability::{AvailableSlots, CalendarDay, CalendarQuery, SlotCheckQuery, SlotsQuery},
        booking::{BookingConfirmation, BookingRequest},
        booking_link::BookingLink,
        lead::{LeadSubmission, QualificationResult},
    },
    scheduling::time::parse_instant,
};

use super::load_link;

/// Slot check response
#[derive(Serialize, ToSchema)]
pub struct SlotCheckResponse {
    /// Requested slot start
    pub start: chrono::DateTime<chrono::Utc>,
    /// Whether the slot can be booked right now
    pub available: bool,
}

/// Get a booking link
#[utoipa::path(
    get,
    path = "/booking-links/{id}",
    tag = "booking-links",
    params(
        ("id" = Uuid, Path, description = "Booking link ID")
    ),
    responses(
        (status = 200, description = "Booking link", body = BookingLink),
        (status = 404, description = "Booking link not found")
    )
)]
pub async fn get_booking_link(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookingLink>> {
    let link = load_link(&state, id).await?;
    Ok(Json(link))
}

/// List bookable slots for one day
#[utoipa::path(
    get,
    path = "/booking-links/{id}/slots",
    tag = "booking-links",
    params(
        ("id" = Uuid, Path, description = "Booking link ID"),
        SlotsQuery
    ),
    responses(
        (status = 200, description = "Available slots (empty with a message when the day is closed)", body = AvailableSlots),
        (status = 400, description = "Invalid date or timezone"),
        (status = 404, description = "Booking link not found"),
        (status = 422, description = "Booking link misconfigured")
    )
)]
pub async fn list_slots(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<AvailableSlots>> {
    let link = load_link(&state, id).await?;
    let slots = state
        .services
        .availability
        .get_available_slots(&link, &query.date, &query.timezone)
        .await?;
    Ok(Json(slots))
}

/// Availability calendar over consecutive days
#[utoipa::path(
    get,
    path = "/booking-links/{id}/calendar",
    tag = "booking-links",
    params(
        ("id" = Uuid, Path, description = "Booking link ID"),
        CalendarQuery
    ),
    responses(
        (status = 200, description = "Slot counts per day", body = Vec<CalendarDay>),
        (status = 400, description = "Invalid date, timezone or day count"),
        (status = 404, description = "Booking link not found")
    )
)]
pub async fn get_calendar(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<Vec<CalendarDay>>> {
    let link = load_link(&state, id).await?;
    let days = state
        .services
        .availability
        .get_availability_calendar(&link, &query.start_date, &query.timezone, query.days)
        .await?;
    Ok(Json(days))
}

/// Check a single slot
#[utoipa::path(
    get,
    path = "/booking-links/{id}/slots/check",
    tag = "booking-links",
    params(
        ("id" = Uuid, Path, description = "Booking link ID"),
        SlotCheckQuery
    ),
    responses(
        (status = 200, description = "Slot availability", body = SlotCheckResponse),
        (status = 400, description = "Invalid timestamp or timezone"),
        (status = 404, description = "Booking link not found")
    )
)]
pub async fn check_slot(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotCheckQuery>,
) -> AppResult<Json<SlotCheckResponse>> {
    let link = load_link(&state, id).await?;
    let start = parse_instant(&query.start)?;
    let available = state
        .services
        .availability
        .is_slot_available(&link, start, &query.timezone)
        .await?;
    Ok(Json(SlotCheckResponse { start, available }))
}

/// Submit the booking form and qualify the lead
#[utoipa::path(
    post,
    path = "/booking-links/{id}/leads",
    tag = "booking-links",
    params(
        ("id" = Uuid, Path, description = "Booking link ID")
    ),
    request_body = LeadSubmission,
    responses(
        (status = 201, description = "Lead stored and qualified (or not)", body = QualificationResult),
        (status = 400, description = "Invalid submission"),
        (status = 404, description = "Booking link not found")
    )
)]
pub async fn submit_lead(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(submission): Json<LeadSubmission>,
) -> AppResult<(StatusCode, Json<QualificationResult>)> {
    let link = load_link(&state, id).await?;
    let result = state.services.qualification.submit_form(&link, submission).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Book a slot
#[utoipa::path(
    post,
    path = "/booking-links/{id}/bookings",
    tag = "booking-links",
    params(
        ("id" = Uuid, Path, description = "Booking link ID")
    ),
    request_body = BookingRequest,
    responses(
        (status = 201, description = "Booking confirmed", body = BookingConfirmation),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Lead disqualified"),
        (status = 404, description = "Booking link or lead not found"),
        (status = 409, description = "Slot no longer available or duplicate booking")
    )
)]
pub async fn create_booking(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BookingRequest>,
) -> AppResult<(StatusCode, Json<BookingConfirmation>)> {
    let link = load_link(&state, id).await?;
    let confirmation = state.services.bookings.book_slot(&link, request).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// Booking statistics for a link
#[utoipa::path(
    get,
    path = "/booking-links/{id}/analytics",
    tag = "booking-links",
    params(
        ("id" = Uuid, Path, description = "Booking link ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Counts and rates", body = BookingAnalytics),
        (status = 404, description = "Booking link not found")
    )
)]
pub async fn get_analytics(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<BookingAnalytics>> {
    let analytics = state
        .services
        .analytics
        .get_booking_analytics(id, query.from, query.to)
        .await?;
    Ok(Json(analytics))
}
