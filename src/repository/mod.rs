//! Repository layer: storage seams and their Postgres / in-memory backends

pub mod assignments;
pub mod directory;
pub mod equipment;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        assignment::{Assignment, AssignmentDraft, AssignmentUpdate},
        enums::AssignmentStatus,
        equipment::EquipmentItem,
        project::Project,
    },
};

/// Read-only view of the equipment inventory
#[async_trait]
pub trait EquipmentRegistry: Send + Sync {
    /// Fails with `NotFound` for unknown ids
    async fn get_status(&self, equipment_id: i32) -> AppResult<EquipmentItem>;

    /// Items without an active exclusive assignment. Recomputed on every call.
    async fn list_available(&self) -> AppResult<Vec<EquipmentItem>>;

    async fn list(&self) -> AppResult<Vec<EquipmentItem>>;
}

/// Owner of all assignment records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssignmentLedger: Send + Sync {
    /// Active assignments of an equipment item, most recent first
    async fn find_active_assignments(&self, equipment_id: i32) -> AppResult<Vec<Assignment>>;

    /// Insert a draft after re-checking exclusivity under a per-equipment lock.
    ///
    /// Fails with `LedgerConflict` when the active set does not admit the draft.
    async fn create(&self, draft: &AssignmentDraft) -> AppResult<Assignment>;

    /// Fails with `NotFound` or `AlreadyClosed`
    async fn close(&self, assignment_id: i32, actual_return_at: DateTime<Utc>) -> AppResult<Assignment>;

    async fn get(&self, assignment_id: i32) -> AppResult<Assignment>;

    async fn update(&self, assignment_id: i32, update: &AssignmentUpdate) -> AppResult<Assignment>;

    async fn list_for_equipment(
        &self,
        equipment_id: i32,
        include_returned: bool,
    ) -> AppResult<Vec<Assignment>>;

    async fn list_active_for_project(&self, project_id: i32) -> AppResult<Vec<Assignment>>;
}

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn get_project(&self, project_id: i32) -> AppResult<Project>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with `NotFound` when the user is unknown
    async fn ensure_user(&self, user_id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait StorageHealth: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// Everything a storage backend has to provide
pub trait Store:
    EquipmentRegistry + AssignmentLedger + ProjectDirectory + UserDirectory + StorageHealth
{
}

impl<T> Store for T where
    T: EquipmentRegistry + AssignmentLedger + ProjectDirectory + UserDirectory + StorageHealth
{
}

/// Postgres-backed repository
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StorageHealth for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Apply an update to an active assignment, checking the status transition.
pub(crate) fn apply_update(existing: &Assignment, update: &AssignmentUpdate) -> AppResult<Assignment> {
    if !existing.is_active() {
        return Err(AppError::AlreadyClosed {
            assignment_id: existing.id,
        });
    }

    let mut next = existing.clone();
    if let Some(status) = update.status {
        if !existing.status.can_transition_to(status) {
            return Err(AppError::Validation(format!(
                "Cannot move assignment {} from {} to {}",
                existing.id, existing.status, status
            )));
        }
        next.status = status;
    }
    if let Some(expected) = update.expected_return_at {
        if expected < existing.assigned_at {
            return Err(AppError::Validation(
                "Expected return date is before the assignment date".to_string(),
            ));
        }
        next.expected_return_at = Some(expected);
    }
    if let Some(ref notes) = update.notes {
        next.notes = Some(notes.clone());
    }
    Ok(next)
}

/// Close an assignment at `actual_return_at`.
pub(crate) fn apply_close(existing: &Assignment, actual_return_at: DateTime<Utc>) -> AppResult<Assignment> {
    if !existing.is_active() {
        return Err(AppError::AlreadyClosed {
            assignment_id: existing.id,
        });
    }
    if actual_return_at < existing.assigned_at {
        return Err(AppError::Validation(
            "Return date is before the assignment date".to_string(),
        ));
    }

    let mut closed = existing.clone();
    closed.actual_return_at = Some(actual_return_at);
    closed.status = AssignmentStatus::Returned;
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment() -> Assignment {
        Assignment {
            id: 4,
            equipment_id: 1,
            project_id: 1,
            assigned_at: Utc::now(),
            expected_return_at: None,
            actual_return_at: None,
            assigned_by: 1,
            is_shared: false,
            authorization_code: None,
            notes: None,
            status: AssignmentStatus::Assigned,
        }
    }

    #[test]
    fn test_update_moves_to_in_use() {
        let update = AssignmentUpdate {
            status: Some(AssignmentStatus::InUse),
            notes: Some("on site".to_string()),
            ..Default::default()
        };
        let next = apply_update(&assignment(), &update).unwrap();
        assert_eq!(next.status, AssignmentStatus::InUse);
        assert_eq!(next.notes.as_deref(), Some("on site"));
    }

    #[test]
    fn test_update_cannot_return() {
        let update = AssignmentUpdate {
            status: Some(AssignmentStatus::Returned),
            ..Default::default()
        };
        assert!(matches!(
            apply_update(&assignment(), &update),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_close_twice_is_already_closed() {
        let a = assignment();
        let closed = apply_close(&a, a.assigned_at + Duration::hours(2)).unwrap();
        assert_eq!(closed.status, AssignmentStatus::Returned);
        assert!(matches!(
            apply_close(&closed, Utc::now()),
            Err(AppError::AlreadyClosed { assignment_id: 4 })
        ));
    }

    #[test]
    fn test_close_before_assignment_rejected() {
        let a = assignment();
        assert!(matches!(
            apply_close(&a, a.assigned_at - Duration::days(1)),
            Err(AppError::Validation(_))
        ));
    }
}
