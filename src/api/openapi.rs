//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{assignments, equipment, health, projects};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Maintrack API",
        version = "1.0.0",
        description = "Equipment assignment REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::list_available_equipment,
        equipment::get_equipment,
        // Assignments
        assignments::request_assignment,
        assignments::get_assignment,
        assignments::update_assignment,
        assignments::release_assignment,
        assignments::list_equipment_assignments,
        // Projects
        projects::list_project_assignments,
    ),
    components(
        schemas(
            // Equipment
            crate::models::equipment::EquipmentItem,
            crate::models::enums::EquipmentStatus,
            // Assignments
            crate::models::assignment::Assignment,
            crate::models::assignment::AssignmentDetails,
            crate::models::assignment::AssignmentRequest,
            crate::models::assignment::AssignmentUpdate,
            crate::models::assignment::ConflictReport,
            crate::models::assignment::ConflictReason,
            crate::models::enums::AssignmentStatus,
            assignments::ReleaseRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment registry"),
        (name = "assignments", description = "Equipment assignment and release"),
        (name = "projects", description = "Project views")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
