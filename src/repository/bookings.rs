//! Bookings repository: the transactional half of the booking flow

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingStatus, NewBooking},
        calendar::{CalendarEvent, EventStatus},
    },
};

/// Postgres SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Map the live-booking uniqueness violation to a slot conflict
fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return AppError::SlotNoLongerAvailable(
                "The host already has a booking at this time".to_string(),
            );
        }
    }
    err.into()
}

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get booking by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    pub async fn list_for_link(
        &self,
        link_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE booking_link_id = $1
              AND ($2::timestamptz IS NULL OR scheduled_start >= $2)
              AND ($3::timestamptz IS NULL OR scheduled_start < $3)
            ORDER BY created_at
            "#,
        )
        .bind(link_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Count non-cancelled bookings of a link starting in `[from, to)`
    pub async fn count_active(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_booking: Option<Uuid>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE booking_link_id = $1
              AND scheduled_start >= $2
              AND scheduled_start < $3
              AND status <> 'cancelled'
              AND ($4::uuid IS NULL OR id <> $4)
            "#,
        )
        .bind(link_id)
        .bind(from)
        .bind(to)
        .bind(exclude_booking)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn latest_for_link(&self, link_id: Uuid) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE booking_link_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    pub async fn count_by_host(
        &self,
        link_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<HashMap<Uuid, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT assigned_host_id, COUNT(*) AS total
            FROM bookings
            WHERE booking_link_id = $1
              AND scheduled_start >= $2
              AND scheduled_start < $3
              AND status <> 'cancelled'
            GROUP BY assigned_host_id
            "#,
        )
        .bind(link_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<Uuid, _>("assigned_host_id"), row.get::<i64, _>("total")))
            .collect())
    }

    pub async fn find_live_by_email(&self, link_id: Uuid, email: &str) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE booking_link_id = $1
              AND LOWER(invitee_email) = LOWER($2)
              AND status IN ('scheduled', 'rescheduled')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(link_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    /// Create the calendar event and the booking in one transaction
    pub async fn create(&self, data: &NewBooking) -> AppResult<(Booking, CalendarEvent)> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, CalendarEvent>(
            r#"
            INSERT INTO calendar_events (id, owner_id, booking_link_id, title, start_time, end_time, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'confirmed')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.assigned_host_id)
        .bind(data.booking_link_id)
        .bind(&data.event_title)
        .bind(data.scheduled_start)
        .bind(data.scheduled_end)
        .fetch_one(&mut *tx)
        .await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, booking_link_id, lead_id, assigned_host_id, calendar_event_id,
                scheduled_start, scheduled_end, timezone, status,
                invitee_name, invitee_email, qualified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'scheduled', $9, $10, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.booking_link_id)
        .bind(data.lead_id)
        .bind(data.assigned_host_id)
        .bind(event.id)
        .bind(data.scheduled_start)
        .bind(data.scheduled_end)
        .bind(&data.timezone)
        .bind(&data.invitee_name)
        .bind(&data.invitee_email)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok((booking, event))
    }

    /// Move a live booking and its event together
    pub async fn reschedule(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: &str,
    ) -> AppResult<(Booking, CalendarEvent)> {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET scheduled_start = $2, scheduled_end = $3, timezone = $4,
                status = 'rescheduled', updated_at = NOW()
            WHERE id = $1 AND status IN ('scheduled', 'rescheduled')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(start)
        .bind(end)
        .bind(timezone)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| AppError::Conflict(format!("Booking {} is not active", id)))?;

        let event = sqlx::query_as::<_, CalendarEvent>(
            r#"
            UPDATE calendar_events
            SET start_time = $2, end_time = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking.calendar_event_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Calendar event {} not found", booking.calendar_event_id)))?;

        sqlx::query("UPDATE booking_reminders SET status = 'cancelled' WHERE booking_id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((booking, event))
    }

    /// Cancel a booking, its event and its pending reminders together
    pub async fn cancel(
        &self,
        id: Uuid,
        reason: Option<&str>,
        cancelled_by: &str,
    ) -> AppResult<(Booking, CalendarEvent)> {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'cancelled', cancellation_reason = $2, cancelled_by = $3, updated_at = NOW()
            WHERE id = $1 AND status <> 'cancelled'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(cancelled_by)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Booking {} is already cancelled", id)))?;

        let event = sqlx::query_as::<_, CalendarEvent>(
            "UPDATE calendar_events SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(booking.calendar_event_id)
        .bind(EventStatus::Cancelled)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Calendar event {} not found", booking.calendar_event_id)))?;

        sqlx::query("UPDATE booking_reminders SET status = 'cancelled' WHERE booking_id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((booking, event))
    }

    pub async fn set_outcome(&self, id: Uuid, status: BookingStatus, closed_won: bool) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $2, closed_won = $3, updated_at = NOW()
            WHERE id = $1 AND status <> 'cancelled'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(closed_won)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Booking {} is cancelled or missing", id)))
    }
}
