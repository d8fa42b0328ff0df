//! Booking history (audit trail)

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::history::HistoryEvent};

#[derive(Clone)]
pub struct HistoryRepository {
    pool: Pool<Postgres>,
}

impl HistoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &HistoryEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_history (kind, booking_link_id, booking_id, actor, details, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.kind.as_str())
        .bind(event.booking_link_id)
        .bind(event.booking_id)
        .bind(&event.actor)
        .bind(&event.details)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
