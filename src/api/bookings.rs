//! Booking lifecycle endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::booking::{Booking, BookingConfirmation, CancelRequest, OutcomeRequest, RescheduleRequest},
};

/// Get a booking
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.store.get_booking(id).await?;
    Ok(Json(booking))
}

/// Move a booking to another slot
#[utoipa::path(
    post,
    path = "/bookings/{id}/reschedule",
    tag = "bookings",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Booking rescheduled", body = BookingConfirmation),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Slot unavailable or booking no longer active"),
        (status = 422, description = "Link does not allow rescheduling")
    )
)]
pub async fn reschedule_booking(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> AppResult<Json<BookingConfirmation>> {
    let confirmation = state.services.bookings.reschedule_booking(id, request).await?;
    Ok(Json(confirmation))
}

/// Cancel a booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already cancelled")
    )
)]
pub async fn cancel_booking(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.cancel_booking(id, request).await?;
    Ok(Json(booking))
}

/// Record whether the meeting happened
#[utoipa::path(
    post,
    path = "/bookings/{id}/outcome",
    tag = "bookings",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    request_body = OutcomeRequest,
    responses(
        (status = 200, description = "Outcome recorded", body = Booking),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking cancelled"),
        (status = 422, description = "Meeting has not started yet")
    )
)]
pub async fn record_outcome(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<OutcomeRequest>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.record_outcome(id, request).await?;
    Ok(Json(booking))
}
