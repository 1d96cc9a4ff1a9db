//! Shared domain enums (stored as SMALLINT codes)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// EquipmentStatus
// ---------------------------------------------------------------------------

/// Maintenance status of an equipment item.
///
/// Independent of assignment state: an operational item may be assigned or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum EquipmentStatus {
    Operational = 0,
    Maintenance = 1,
    OutOfService = 2,
    Repair = 3,
}

impl TryFrom<i16> for EquipmentStatus {
    type Error = AppError;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(EquipmentStatus::Operational),
            1 => Ok(EquipmentStatus::Maintenance),
            2 => Ok(EquipmentStatus::OutOfService),
            3 => Ok(EquipmentStatus::Repair),
            other => Err(AppError::Internal(format!("Unknown equipment status code {}", other))),
        }
    }
}

impl From<EquipmentStatus> for i16 {
    fn from(s: EquipmentStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Operational => "operational",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::OutOfService => "out_of_service",
            EquipmentStatus::Repair => "repair",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// AssignmentStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum AssignmentStatus {
    Assigned = 0,
    InUse = 1,
    Returned = 2,
}

impl AssignmentStatus {
    /// Transitions allowed through an update. `Returned` is only reached by closing.
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        matches!(
            (self, next),
            (AssignmentStatus::Assigned, AssignmentStatus::Assigned)
                | (AssignmentStatus::Assigned, AssignmentStatus::InUse)
                | (AssignmentStatus::InUse, AssignmentStatus::InUse)
        )
    }
}

impl TryFrom<i16> for AssignmentStatus {
    type Error = AppError;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(AssignmentStatus::Assigned),
            1 => Ok(AssignmentStatus::InUse),
            2 => Ok(AssignmentStatus::Returned),
            other => Err(AppError::Internal(format!("Unknown assignment status code {}", other))),
        }
    }
}

impl From<AssignmentStatus> for i16 {
    fn from(s: AssignmentStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InUse => "in_use",
            AssignmentStatus::Returned => "returned",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Rights
// ---------------------------------------------------------------------------

/// Access level carried in token claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rights {
    None = 0,
    Read = 1,
    Write = 2,
}

impl Default for Rights {
    fn default() -> Self {
        Rights::None
    }
}
