//! Leads captured through booking forms

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        lead::{Lead, NewLead},
        rule::FormResponses,
    },
};

#[derive(Debug, FromRow)]
struct LeadRow {
    id: Uuid,
    booking_link_id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    country_code: Option<String>,
    form_responses: Json<FormResponses>,
    qualified: bool,
    disqualification_reason: Option<String>,
    last_booking_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Lead {
            id: row.id,
            booking_link_id: row.booking_link_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            country_code: row.country_code,
            form_responses: row.form_responses.0,
            qualified: row.qualified,
            disqualification_reason: row.disqualification_reason,
            last_booking_id: row.last_booking_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct LeadsRepository {
    pool: Pool<Postgres>,
}

impl LeadsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get lead by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Lead> {
        sqlx::query_as::<_, LeadRow>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Lead::from)
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }

    /// Insert or refresh the lead of (link, email)
    pub async fn upsert(&self, data: &NewLead) -> AppResult<Lead> {
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            INSERT INTO leads (
                id, booking_link_id, name, email, phone, company, country_code,
                form_responses, qualified, disqualification_reason, last_booking_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (booking_link_id, LOWER(email)) DO UPDATE SET
                name = EXCLUDED.name,
                phone = COALESCE(EXCLUDED.phone, leads.phone),
                company = COALESCE(EXCLUDED.company, leads.company),
                country_code = COALESCE(EXCLUDED.country_code, leads.country_code),
                form_responses = leads.form_responses || EXCLUDED.form_responses,
                qualified = EXCLUDED.qualified,
                disqualification_reason = EXCLUDED.disqualification_reason,
                last_booking_id = COALESCE(EXCLUDED.last_booking_id, leads.last_booking_id),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.booking_link_id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.company)
        .bind(&data.country_code)
        .bind(Json(&data.form_responses))
        .bind(data.qualified)
        .bind(&data.disqualification_reason)
        .bind(data.last_booking_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn list_for_link(&self, link_id: Uuid) -> AppResult<Vec<Lead>> {
        let rows = sqlx::query_as::<_, LeadRow>(
            "SELECT * FROM leads WHERE booking_link_id = $1 ORDER BY created_at",
        )
        .bind(link_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Lead::from).collect())
    }
}
