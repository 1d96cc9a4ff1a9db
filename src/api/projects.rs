//! Project endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::assignment::AssignmentDetails};

use super::AuthenticatedUser;

/// Equipment currently assigned to a project
#[utoipa::path(
    get,
    path = "/projects/{id}/assignments",
    tag = "projects",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Active assignments of the project", body = Vec<AssignmentDetails>),
        (status = 404, description = "Project not found")
    )
)]
pub async fn list_project_assignments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<AssignmentDetails>>> {
    claims.require_read_assignments()?;
    let assignments = state.services.assignments.project_assignments(id).await?;
    Ok(Json(assignments))
}
