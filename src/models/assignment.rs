//! Assignment model and the request/decision types of the coordinator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::enums::AssignmentStatus;
use crate::error::AppError;

/// Assignment of an equipment item to a project.
///
/// Active while `actual_return_at` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub id: i32,
    pub equipment_id: i32,
    pub project_id: i32,
    pub assigned_at: DateTime<Utc>,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub actual_return_at: Option<DateTime<Utc>>,
    /// User who committed the assignment
    pub assigned_by: i32,
    pub is_shared: bool,
    /// Only present on shared assignments
    #[serde(skip_serializing)]
    pub authorization_code: Option<String>,
    pub notes: Option<String>,
    pub status: AssignmentStatus,
}

impl Assignment {
    pub fn is_active(&self) -> bool {
        self.actual_return_at.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.expected_return_at.map(|d| d < now).unwrap_or(false)
    }
}

/// Raw assignment row
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: i32,
    pub equipment_id: i32,
    pub project_id: i32,
    pub assigned_at: DateTime<Utc>,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub actual_return_at: Option<DateTime<Utc>>,
    pub assigned_by: i32,
    pub is_shared: bool,
    pub authorization_code: Option<String>,
    pub notes: Option<String>,
    pub status: i16,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Assignment {
            id: row.id,
            equipment_id: row.equipment_id,
            project_id: row.project_id,
            assigned_at: row.assigned_at,
            expected_return_at: row.expected_return_at,
            actual_return_at: row.actual_return_at,
            assigned_by: row.assigned_by,
            is_shared: row.is_shared,
            authorization_code: row.authorization_code,
            notes: row.notes,
            status: AssignmentStatus::try_from(row.status)?,
        })
    }
}

/// Record the ledger is asked to insert
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDraft {
    pub equipment_id: i32,
    pub project_id: i32,
    pub assigned_by: i32,
    pub is_shared: bool,
    pub authorization_code: Option<String>,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl AssignmentDraft {
    /// Returns the active assignment that forbids inserting this draft, if any.
    ///
    /// `active` is the current active set of the draft's equipment. Coexistence is
    /// only allowed when every record, the draft included, is shared under the same code.
    pub fn blocking_assignment<'a>(&self, active: &'a [Assignment]) -> Option<&'a Assignment> {
        if let Some(exclusive) = active.iter().find(|a| !a.is_shared) {
            return Some(exclusive);
        }
        if let Some(own) = active.iter().find(|a| a.project_id == self.project_id) {
            return Some(own);
        }
        if !self.is_shared {
            return active.first();
        }
        active
            .iter()
            .find(|a| a.authorization_code != self.authorization_code)
    }
}

/// Fields a caller may change on an active assignment
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate, ToSchema)]
pub struct AssignmentUpdate {
    pub expected_return_at: Option<DateTime<Utc>>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
    /// Only `assigned` -> `in_use` is accepted
    pub status: Option<AssignmentStatus>,
}

impl AssignmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.expected_return_at.is_none() && self.notes.is_none() && self.status.is_none()
    }
}

/// Request to assign an equipment item to a project
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_shared_code"))]
pub struct AssignmentRequest {
    pub equipment_id: i32,
    pub project_id: i32,
    /// Mark the new assignment as shared (requires an authorization code)
    #[serde(default)]
    pub is_shared: bool,
    /// Code for a shared assignment, or the code of the shared assignment being joined
    pub authorization_code: Option<String>,
    /// Requesting user id
    pub assigned_by: i32,
    pub expected_return_at: Option<DateTime<Utc>>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// The code is only stored when the request itself is shared, so only then is it checked
fn validate_shared_code(request: &AssignmentRequest) -> Result<(), ValidationError> {
    if !request.is_shared {
        return Ok(());
    }
    match request.authorization_code.as_deref() {
        None => Err(ValidationError::new("authorization_code")
            .with_message("A shared assignment requires an authorization code".into())),
        Some(code) if code.is_empty() || code.chars().count() > 64 => {
            Err(ValidationError::new("authorization_code")
                .with_message("Authorization code must be 1-64 characters".into()))
        }
        Some(_) => Ok(()),
    }
}

/// Why the gate allowed or denied a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    NoConflict,
    /// The requesting project already holds the equipment; update in place
    SameProject,
    SharedAuthorized,
    SharedCodeInvalid,
    ExclusiveConflict,
}

/// Outcome of the authorization gate, never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub conflicting_assignment: Option<Assignment>,
    pub reason: DecisionReason,
}

impl AuthorizationDecision {
    pub fn allow(reason: DecisionReason, conflicting_assignment: Option<Assignment>) -> Self {
        Self {
            allowed: true,
            conflicting_assignment,
            reason,
        }
    }

    pub fn deny(reason: DecisionReason, conflicting_assignment: Assignment) -> Self {
        Self {
            allowed: false,
            conflicting_assignment: Some(conflicting_assignment),
            reason,
        }
    }
}

/// Reason attached to a conflict report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    ExclusiveConflict,
    SharedCodeInvalid,
    /// The ledger re-check failed after the gate approved
    RaceLost,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConflictReason::ExclusiveConflict => "exclusive_conflict",
            ConflictReason::SharedCodeInvalid => "shared_code_invalid",
            ConflictReason::RaceLost => "race_lost",
        };
        write!(f, "{}", label)
    }
}

/// Returned to the caller when a request is denied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConflictReport {
    pub conflicting_project_id: i32,
    pub conflicting_project_name: String,
    pub is_shared: bool,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub reason: ConflictReason,
}

/// Assignment with computed display fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentDetails {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub is_overdue: bool,
}

impl AssignmentDetails {
    pub fn from_assignment(assignment: Assignment, now: DateTime<Utc>) -> Self {
        let is_overdue = assignment.is_overdue(now);
        Self {
            assignment,
            is_overdue,
        }
    }
}
