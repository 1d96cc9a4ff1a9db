//! Assignment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::assignment::{Assignment, AssignmentDetails, AssignmentRequest, AssignmentUpdate},
};

use super::AuthenticatedUser;

/// Release (return) request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReleaseRequest {
    /// Return date, defaults to now
    pub actual_return_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignmentHistoryQuery {
    /// Include returned assignments
    #[serde(default)]
    pub history: bool,
}

/// Request an equipment assignment for a project
#[utoipa::path(
    post,
    path = "/assignments",
    tag = "assignments",
    security(("bearer_auth" = [])),
    request_body = AssignmentRequest,
    responses(
        (status = 201, description = "Assignment committed, or the project's existing assignment refreshed", body = Assignment),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Equipment, project or user not found"),
        (status = 409, description = "Equipment held by another project", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_assignment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AssignmentRequest>,
) -> AppResult<(StatusCode, Json<Assignment>)> {
    claims.require_write_assignments()?;

    tracing::debug!(
        "User {} requests equipment {} for project {}",
        claims.user_id,
        request.equipment_id,
        request.project_id
    );
    let assignment = state.services.assignments.request_assignment(request).await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Get an assignment
#[utoipa::path(
    get,
    path = "/assignments/{id}",
    tag = "assignments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment details", body = AssignmentDetails),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn get_assignment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<AssignmentDetails>> {
    claims.require_read_assignments()?;
    let assignment = state.services.assignments.get_assignment(id).await?;
    Ok(Json(assignment))
}

/// Update expected return date, notes or status of an active assignment
#[utoipa::path(
    put,
    path = "/assignments/{id}",
    tag = "assignments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Assignment ID")),
    request_body = AssignmentUpdate,
    responses(
        (status = 200, description = "Assignment updated", body = Assignment),
        (status = 400, description = "Invalid update"),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "Assignment already closed")
    )
)]
pub async fn update_assignment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<AssignmentUpdate>,
) -> AppResult<Json<Assignment>> {
    claims.require_write_assignments()?;
    let assignment = state.services.assignments.update_assignment(id, update).await?;
    Ok(Json(assignment))
}

/// Return equipment: close the assignment
#[utoipa::path(
    post,
    path = "/assignments/{id}/return",
    tag = "assignments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Assignment ID")),
    request_body(content = ReleaseRequest, description = "Optional return date"),
    responses(
        (status = 200, description = "Assignment closed", body = Assignment),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "Assignment already closed")
    )
)]
pub async fn release_assignment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    request: Option<Json<ReleaseRequest>>,
) -> AppResult<Json<Assignment>> {
    claims.require_write_assignments()?;

    let request = request.map(|Json(r)| r).unwrap_or_default();
    let returned_at = request.actual_return_at.unwrap_or_else(Utc::now);
    let assignment = state
        .services
        .assignments
        .release_assignment(id, returned_at)
        .await?;

    Ok(Json(assignment))
}

/// List the assignments of an equipment item
#[utoipa::path(
    get,
    path = "/equipment/{id}/assignments",
    tag = "assignments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Equipment ID"),
        AssignmentHistoryQuery
    ),
    responses(
        (status = 200, description = "Active assignments, most recent first", body = Vec<AssignmentDetails>),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn list_equipment_assignments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<AssignmentHistoryQuery>,
) -> AppResult<Json<Vec<AssignmentDetails>>> {
    claims.require_read_assignments()?;
    let assignments = state
        .services
        .assignments
        .equipment_assignments(id, query.history)
        .await?;
    Ok(Json(assignments))
}
