//! Reminder records

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::reminder::{NewReminder, Reminder, ReminderStatus},
};

#[derive(Clone)]
pub struct RemindersRepository {
    pool: Pool<Postgres>,
}

impl RemindersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn insert_many(&self, reminders: &[NewReminder]) -> AppResult<Vec<Reminder>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(reminders.len());

        for reminder in reminders {
            let row = sqlx::query_as::<_, Reminder>(
                r#"
                INSERT INTO booking_reminders (id, booking_id, remind_at, offset_minutes, status)
                VALUES ($1, $2, $3, $4, 'pending')
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(reminder.booking_id)
            .bind(reminder.remind_at)
            .bind(reminder.offset_minutes)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Pending reminders whose time has come
    pub async fn due(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT * FROM booking_reminders
            WHERE status = 'pending' AND remind_at <= $1
            ORDER BY remind_at
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn mark(&self, id: Uuid, status: ReminderStatus, at: DateTime<Utc>) -> AppResult<()> {
        let sent_at = (status == ReminderStatus::Sent).then_some(at);
        let result = sqlx::query("UPDATE booking_reminders SET status = $2, sent_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status)
            .bind(sent_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reminder {} not found", id)));
        }
        Ok(())
    }
}
