//! Calendar events as seen by availability queries

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::calendar::{BusyInterval, CalendarEvent},
};

#[derive(Clone)]
pub struct CalendarRepository {
    pool: Pool<Postgres>,
}

impl CalendarRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get calendar event by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<CalendarEvent> {
        sqlx::query_as::<_, CalendarEvent>("SELECT * FROM calendar_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Calendar event {} not found", id)))
    }

    /// Live events of the given hosts overlapping `[from, to)`
    pub async fn list_busy(
        &self,
        host_ids: &[Uuid],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BusyInterval>> {
        if host_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BusyInterval>(
            r#"
            SELECT owner_id AS host_user_id, id AS event_id,
                   start_time AS start, end_time AS "end", status
            FROM calendar_events
            WHERE owner_id = ANY($1)
              AND start_time < $3
              AND end_time > $2
              AND status NOT IN ('cancelled', 'declined')
            ORDER BY start_time
            "#,
        )
        .bind(host_ids)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
