//! Equipment service

use std::sync::Arc;

use crate::{error::AppResult, models::equipment::EquipmentItem, repository::EquipmentRegistry};

#[derive(Clone)]
pub struct EquipmentService {
    registry: Arc<dyn EquipmentRegistry>,
}

impl EquipmentService {
    pub fn new(registry: Arc<dyn EquipmentRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list(&self) -> AppResult<Vec<EquipmentItem>> {
        self.registry.list().await
    }

    pub async fn get_status(&self, id: i32) -> AppResult<EquipmentItem> {
        self.registry.get_status(id).await
    }

    /// Equipment without an active exclusive assignment
    pub async fn list_available(&self) -> AppResult<Vec<EquipmentItem>> {
        self.registry.list_available().await
    }
}
