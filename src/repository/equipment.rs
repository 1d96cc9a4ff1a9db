//! Equipment registry on Postgres

use async_trait::async_trait;

use super::{EquipmentRegistry, Repository};
use crate::{
    error::{AppError, AppResult, ResourceKind},
    models::equipment::{EquipmentItem, EquipmentRow},
};

const EQUIPMENT_COLUMNS: &str = "id, name, serial_number, status, notes, created_at, updated_at";

#[async_trait]
impl EquipmentRegistry for Repository {
    async fn get_status(&self, equipment_id: i32) -> AppResult<EquipmentItem> {
        let query = format!("SELECT {} FROM equipment WHERE id = $1", EQUIPMENT_COLUMNS);
        sqlx::query_as::<_, EquipmentRow>(&query)
            .bind(equipment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::Equipment, equipment_id))?
            .try_into()
    }

    async fn list_available(&self) -> AppResult<Vec<EquipmentItem>> {
        let query = format!(
            r#"
            SELECT {} FROM equipment e
            WHERE NOT EXISTS (
                SELECT 1 FROM assignments a
                WHERE a.equipment_id = e.id
                  AND a.actual_return_at IS NULL
                  AND a.is_shared = FALSE
            )
            ORDER BY e.name, e.id
            "#,
            EQUIPMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EquipmentRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(EquipmentItem::try_from).collect()
    }

    async fn list(&self) -> AppResult<Vec<EquipmentItem>> {
        let query = format!("SELECT {} FROM equipment ORDER BY name, id", EQUIPMENT_COLUMNS);
        let rows = sqlx::query_as::<_, EquipmentRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(EquipmentItem::try_from).collect()
    }
}
