//! Leads captured by booking forms

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::rule::FormResponses;

/// Lead record, persisted whether or not it qualifies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    pub id: Uuid,
    pub booking_link_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub country_code: Option<String>,
    #[schema(value_type = Object)]
    pub form_responses: FormResponses,
    pub qualified: bool,
    pub disqualification_reason: Option<String>,
    /// Latest booking made by this lead
    pub last_booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lead upsert payload; the store keys leads on (link, email)
#[derive(Debug, Clone)]
pub struct NewLead {
    pub booking_link_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub country_code: Option<String>,
    pub form_responses: FormResponses,
    pub qualified: bool,
    pub disqualification_reason: Option<String>,
    pub last_booking_id: Option<Uuid>,
}

/// Form submission made before picking a slot
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LeadSubmission {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    #[validate(length(equal = 2, message = "Country code must be 2 letters"))]
    pub country_code: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_responses: FormResponses,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QualificationResult {
    pub lead_id: Uuid,
    pub qualified: bool,
    pub disqualification_reason: Option<String>,
}
