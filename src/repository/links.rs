//! Booking links and host rosters

use sqlx::{types::Json, FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking_link::{
            BookingLink, DateRangePolicy, LinkHost, NotificationSettings, QualificationSettings,
        },
        rule::{DisqualificationRule, RoutingRule},
    },
};

/// `booking_links` row; nested settings live in JSONB columns
#[derive(Debug, FromRow)]
struct BookingLinkRow {
    id: Uuid,
    owner_id: Uuid,
    slug: String,
    name: String,
    duration_minutes: i32,
    date_range: Json<DateRangePolicy>,
    start_time_increment: i32,
    buffer_before: i32,
    buffer_after: i32,
    min_notice_hours: i32,
    max_bookings_per_day: Option<i32>,
    assignment_type: String,
    allow_reschedule: bool,
    prevent_duplicate_bookings: bool,
    disqualification_rules: Json<Vec<DisqualificationRule>>,
    routing_rules: Json<Vec<RoutingRule>>,
    qualification: Json<QualificationSettings>,
    notifications: Json<NotificationSettings>,
}

impl TryFrom<BookingLinkRow> for BookingLink {
    type Error = AppError;

    fn try_from(row: BookingLinkRow) -> Result<Self, Self::Error> {
        let assignment_type = row
            .assignment_type
            .parse()
            .map_err(|e: String| AppError::InvalidConfiguration(format!("booking link {}: {}", row.id, e)))?;

        Ok(BookingLink {
            id: row.id,
            owner_id: row.owner_id,
            slug: row.slug,
            name: row.name,
            duration_minutes: row.duration_minutes,
            date_range: row.date_range.0,
            start_time_increment: row.start_time_increment,
            buffer_before: row.buffer_before,
            buffer_after: row.buffer_after,
            min_notice_hours: row.min_notice_hours,
            max_bookings_per_day: row.max_bookings_per_day,
            assignment_type,
            allow_reschedule: row.allow_reschedule,
            prevent_duplicate_bookings: row.prevent_duplicate_bookings,
            disqualification_rules: row.disqualification_rules.0,
            routing_rules: row.routing_rules.0,
            qualification: row.qualification.0,
            notifications: row.notifications.0,
        })
    }
}

#[derive(Debug, FromRow)]
struct LinkHostRow {
    user_id: Uuid,
    priority: i32,
    is_active: bool,
}

#[derive(Clone)]
pub struct LinksRepository {
    pool: Pool<Postgres>,
}

impl LinksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get booking link by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookingLink> {
        let row = sqlx::query_as::<_, BookingLinkRow>(
            r#"
            SELECT id, owner_id, slug, name, duration_minutes, date_range,
                   start_time_increment, buffer_before, buffer_after, min_notice_hours,
                   max_bookings_per_day, assignment_type, allow_reschedule,
                   prevent_duplicate_bookings, disqualification_rules, routing_rules,
                   qualification, notifications
            FROM booking_links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking link {} not found", id)))?;

        row.try_into()
    }

    /// Roster of a link, highest priority first
    pub async fn list_hosts(&self, link_id: Uuid) -> AppResult<Vec<LinkHost>> {
        let rows = sqlx::query_as::<_, LinkHostRow>(
            r#"
            SELECT user_id, priority, is_active
            FROM booking_link_hosts
            WHERE booking_link_id = $1
            ORDER BY priority DESC, user_id
            "#,
        )
        .bind(link_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| LinkHost {
                user_id: row.user_id,
                priority: row.priority,
                is_active: row.is_active,
            })
            .collect())
    }
}
