//! Assignment ledger on Postgres
//!
//! `create` runs inside a transaction holding `pg_advisory_xact_lock(namespace, equipment_id)`,
//! so concurrent inserts for one equipment item serialize on the re-check. The partial unique
//! index `assignments_one_exclusive_active` backs the exclusivity rule for writers that bypass
//! the ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use super::{apply_close, apply_update, AssignmentLedger, Repository};
use crate::{
    error::{AppError, AppResult, ResourceKind},
    models::assignment::{Assignment, AssignmentDraft, AssignmentRow, AssignmentUpdate},
    models::enums::AssignmentStatus,
};

/// First key of the advisory lock pair; the second is the equipment id
const LEDGER_LOCK_NAMESPACE: i32 = 0x4153_474e;

const ASSIGNMENT_COLUMNS: &str = "id, equipment_id, project_id, assigned_at, expected_return_at, \
     actual_return_at, assigned_by, is_shared, authorization_code, notes, status";

fn into_assignments(rows: Vec<AssignmentRow>) -> AppResult<Vec<Assignment>> {
    rows.into_iter().map(Assignment::try_from).collect()
}

async fn fetch_active<'e, E>(executor: E, equipment_id: i32) -> AppResult<Vec<Assignment>>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        r#"
        SELECT {} FROM assignments
        WHERE equipment_id = $1 AND actual_return_at IS NULL
        ORDER BY assigned_at DESC, id DESC
        "#,
        ASSIGNMENT_COLUMNS
    );
    let rows = sqlx::query_as::<_, AssignmentRow>(&query)
        .bind(equipment_id)
        .fetch_all(executor)
        .await?;
    into_assignments(rows)
}

async fn fetch_one<'e, E>(executor: E, assignment_id: i32, for_update: bool) -> AppResult<Assignment>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "SELECT {} FROM assignments WHERE id = $1{}",
        ASSIGNMENT_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, AssignmentRow>(&query)
        .bind(assignment_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found(ResourceKind::Assignment, assignment_id))?
        .try_into()
}

#[async_trait]
impl AssignmentLedger for Repository {
    async fn find_active_assignments(&self, equipment_id: i32) -> AppResult<Vec<Assignment>> {
        fetch_active(&self.pool, equipment_id).await
    }

    async fn create(&self, draft: &AssignmentDraft) -> AppResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(LEDGER_LOCK_NAMESPACE)
            .bind(draft.equipment_id)
            .execute(&mut *tx)
            .await?;

        let active = fetch_active(&mut *tx, draft.equipment_id).await?;
        if let Some(blocking) = draft.blocking_assignment(&active) {
            tracing::debug!(
                "Ledger refused draft for equipment {}: held by assignment {}",
                draft.equipment_id,
                blocking.id
            );
            return Err(AppError::LedgerConflict {
                blocking: Box::new(blocking.clone()),
            });
        }

        let query = format!(
            r#"
            INSERT INTO assignments (
                equipment_id, project_id, assigned_at, expected_return_at,
                assigned_by, is_shared, authorization_code, notes, status
            )
            VALUES ($1, $2, NOW(), $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            ASSIGNMENT_COLUMNS
        );
        let inserted = sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(draft.equipment_id)
            .bind(draft.project_id)
            .bind(draft.expected_return_at)
            .bind(draft.assigned_by)
            .bind(draft.is_shared)
            .bind(&draft.authorization_code)
            .bind(&draft.notes)
            .bind(i16::from(AssignmentStatus::Assigned))
            .fetch_one(&mut *tx)
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                drop(tx);
                let active = fetch_active(&self.pool, draft.equipment_id).await?;
                let blocking = active
                    .into_iter()
                    .find(|a| !a.is_shared)
                    .ok_or_else(|| AppError::Internal("Unique violation without exclusive holder".to_string()))?;
                return Err(AppError::LedgerConflict {
                    blocking: Box::new(blocking),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        row.try_into()
    }

    async fn close(&self, assignment_id: i32, actual_return_at: DateTime<Utc>) -> AppResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_one(&mut *tx, assignment_id, true).await?;
        let closed = apply_close(&existing, actual_return_at)?;

        let query = format!(
            "UPDATE assignments SET actual_return_at = $2, status = $3 WHERE id = $1 RETURNING {}",
            ASSIGNMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(assignment_id)
            .bind(closed.actual_return_at)
            .bind(i16::from(closed.status))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn get(&self, assignment_id: i32) -> AppResult<Assignment> {
        fetch_one(&self.pool, assignment_id, false).await
    }

    async fn update(&self, assignment_id: i32, update: &AssignmentUpdate) -> AppResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_one(&mut *tx, assignment_id, true).await?;
        let next = apply_update(&existing, update)?;

        let query = format!(
            r#"
            UPDATE assignments
            SET expected_return_at = $2, notes = $3, status = $4
            WHERE id = $1
            RETURNING {}
            "#,
            ASSIGNMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(assignment_id)
            .bind(next.expected_return_at)
            .bind(&next.notes)
            .bind(i16::from(next.status))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn list_for_equipment(
        &self,
        equipment_id: i32,
        include_returned: bool,
    ) -> AppResult<Vec<Assignment>> {
        if !include_returned {
            return fetch_active(&self.pool, equipment_id).await;
        }
        let query = format!(
            "SELECT {} FROM assignments WHERE equipment_id = $1 ORDER BY assigned_at DESC, id DESC",
            ASSIGNMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(equipment_id)
            .fetch_all(&self.pool)
            .await?;
        into_assignments(rows)
    }

    async fn list_active_for_project(&self, project_id: i32) -> AppResult<Vec<Assignment>> {
        let query = format!(
            r#"
            SELECT {} FROM assignments
            WHERE project_id = $1 AND actual_return_at IS NULL
            ORDER BY assigned_at DESC, id DESC
            "#,
            ASSIGNMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        into_assignments(rows)
    }
}
