//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::EquipmentStatus;
use crate::error::AppError;

/// Equipment item as seen by the assignment coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EquipmentItem {
    pub id: i32,
    /// Equipment name / description
    pub name: String,
    pub serial_number: Option<String>,
    pub status: EquipmentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Raw equipment row
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRow {
    pub id: i32,
    pub name: String,
    pub serial_number: Option<String>,
    pub status: i16,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<EquipmentRow> for EquipmentItem {
    type Error = AppError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        Ok(EquipmentItem {
            id: row.id,
            name: row.name,
            serial_number: row.serial_number,
            status: EquipmentStatus::try_from(row.status)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
