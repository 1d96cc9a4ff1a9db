//! Business logic services

pub mod assignments;
pub mod authorization;
pub mod equipment;

use std::sync::Arc;

use crate::{
    error::AppResult,
    repository::{StorageHealth, Store},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub assignments: assignments::AssignmentCoordinator,
    storage: Arc<dyn StorageHealth>,
}

impl Services {
    /// Create all services on top of one storage backend
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: Store + 'static,
    {
        Self {
            equipment: equipment::EquipmentService::new(store.clone()),
            assignments: assignments::AssignmentCoordinator::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            storage: store,
        }
    }

    /// Check that the storage backend answers
    pub async fn ping_storage(&self) -> AppResult<()> {
        self.storage.ping().await
    }
}
