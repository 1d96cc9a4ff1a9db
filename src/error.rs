//! Error types for Maintrack server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::assignment::{Assignment, ConflictReason, ConflictReport};

/// Numeric error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchEquipment = 4,
    NoSuchProject = 5,
    NoSuchUser = 6,
    NoSuchAssignment = 7,
    ExclusiveConflict = 8,
    SharedCodeInvalid = 9,
    RaceLost = 10,
    AlreadyClosed = 11,
    BadValue = 12,
}

/// Kind of record a `NotFound` error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Equipment,
    Project,
    User,
    Assignment,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ResourceKind::Equipment => "Equipment",
            ResourceKind::Project => "Project",
            ResourceKind::User => "User",
            ResourceKind::Assignment => "Assignment",
        };
        write!(f, "{}", label)
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: i32 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request denied by the authorization gate or lost the commit race
    #[error("Assignment conflict ({}) with project {}", .0.reason, .0.conflicting_project_id)]
    Conflict(ConflictReport),

    /// The ledger's atomic re-check refused the draft
    #[error("Equipment {} is held by assignment {}", .blocking.equipment_id, .blocking.id)]
    LedgerConflict { blocking: Box<Assignment> },

    #[error("Assignment {assignment_id} is already closed")]
    AlreadyClosed { assignment_id: i32 },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: ResourceKind, id: i32) -> Self {
        AppError::NotFound { kind, id }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Present on assignment conflicts so clients can branch on `reason`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictReport>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, code, message, conflict) = match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg, None)
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg, None)
            }
            AppError::NotFound { kind, .. } => {
                let code = match kind {
                    ResourceKind::Equipment => ErrorCode::NoSuchEquipment,
                    ResourceKind::Project => ErrorCode::NoSuchProject,
                    ResourceKind::User => ErrorCode::NoSuchUser,
                    ResourceKind::Assignment => ErrorCode::NoSuchAssignment,
                };
                (StatusCode::NOT_FOUND, code, message, None)
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg, None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Conflict(report) => {
                let code = match report.reason {
                    ConflictReason::ExclusiveConflict => ErrorCode::ExclusiveConflict,
                    ConflictReason::SharedCodeInvalid => ErrorCode::SharedCodeInvalid,
                    ConflictReason::RaceLost => ErrorCode::RaceLost,
                };
                (StatusCode::CONFLICT, code, message, Some(report))
            }
            AppError::LedgerConflict { .. } => {
                (StatusCode::CONFLICT, ErrorCode::RaceLost, message, None)
            }
            AppError::AlreadyClosed { .. } => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyClosed, message, None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            conflict,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
