//! Assignment preview endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppResult, models::rule::FormResponses};

use super::load_link;

/// Assignment preview request
#[derive(Deserialize, ToSchema)]
pub struct AssignmentPreviewRequest {
    pub booking_link_id: Uuid,
    /// Form answers used by routing rules
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_responses: FormResponses,
}

#[derive(Serialize, ToSchema)]
pub struct AssignmentPreviewResponse {
    /// Host the next booking would go to, calendars aside
    pub host_id: Uuid,
    /// Effective roster the choice was made from
    pub roster: Vec<Uuid>,
    /// Strategy configured on the link
    pub strategy: String,
}

/// Preview which host would receive the next booking
#[utoipa::path(
    post,
    path = "/assignments/preview",
    tag = "assignments",
    request_body = AssignmentPreviewRequest,
    responses(
        (status = 200, description = "Chosen host", body = AssignmentPreviewResponse),
        (status = 404, description = "Booking link not found")
    )
)]
pub async fn preview_assignment(
    State(state): State<crate::AppState>,
    Json(request): Json<AssignmentPreviewRequest>,
) -> AppResult<Json<AssignmentPreviewResponse>> {
    let link = load_link(&state, request.booking_link_id).await?;
    let roster = state.services.availability.roster(&link).await?;
    let host_id = state
        .services
        .assignment
        .determine_assignment(&link, &roster, &request.form_responses)
        .await?;

    Ok(Json(AssignmentPreviewResponse {
        host_id,
        roster,
        strategy: link.assignment_type.as_str().to_string(),
    }))
}
