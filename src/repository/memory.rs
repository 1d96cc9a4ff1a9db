//! In-memory storage backend
//!
//! Assignments live in an arena keyed by id with secondary indexes by equipment and project.
//! `create` holds a per-equipment async mutex across the check-then-insert sequence.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::{
    apply_close, apply_update, AssignmentLedger, EquipmentRegistry, ProjectDirectory, StorageHealth,
    UserDirectory,
};
use crate::{
    error::{AppError, AppResult, ResourceKind},
    models::{
        assignment::{Assignment, AssignmentDraft, AssignmentUpdate},
        enums::{AssignmentStatus, EquipmentStatus},
        equipment::EquipmentItem,
        project::Project,
        user::User,
    },
};

/// Directory and inventory records loaded into a `MemoryStore`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub equipment: Vec<EquipmentItem>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl Fixtures {
    /// Load fixtures from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Internal(format!("Failed to read fixtures {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("Invalid fixtures {}: {}", path.display(), e)))
    }

    pub fn equipment(mut self, id: i32, name: &str, status: EquipmentStatus) -> Self {
        self.equipment.push(EquipmentItem {
            id,
            name: name.to_string(),
            serial_number: None,
            status,
            notes: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        });
        self
    }

    pub fn project(mut self, id: i32, name: &str) -> Self {
        self.projects.push(Project {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn user(mut self, id: i32, login: &str) -> Self {
        self.users.push(User {
            id,
            login: login.to_string(),
        });
        self
    }
}

#[derive(Default)]
struct LedgerArena {
    next_id: i32,
    records: BTreeMap<i32, Assignment>,
    by_equipment: HashMap<i32, Vec<i32>>,
    by_project: HashMap<i32, Vec<i32>>,
}

impl LedgerArena {
    /// Records behind `ids`, most recent first
    fn records_for<'a>(&'a self, ids: Option<&'a Vec<i32>>) -> impl Iterator<Item = &'a Assignment> + 'a {
        ids.into_iter()
            .flat_map(|ids| ids.iter().rev())
            .filter_map(move |id| self.records.get(id))
    }

    fn active_for_equipment(&self, equipment_id: i32) -> Vec<Assignment> {
        self.records_for(self.by_equipment.get(&equipment_id))
            .filter(|a| a.is_active())
            .cloned()
            .collect()
    }

    fn holds_exclusive(&self, equipment_id: i32) -> bool {
        self.records_for(self.by_equipment.get(&equipment_id))
            .any(|a| a.is_active() && !a.is_shared)
    }

    fn insert(&mut self, draft: &AssignmentDraft) -> Assignment {
        self.next_id += 1;
        let assignment = Assignment {
            id: self.next_id,
            equipment_id: draft.equipment_id,
            project_id: draft.project_id,
            assigned_at: Utc::now(),
            expected_return_at: draft.expected_return_at,
            actual_return_at: None,
            assigned_by: draft.assigned_by,
            is_shared: draft.is_shared,
            authorization_code: draft.authorization_code.clone(),
            notes: draft.notes.clone(),
            status: AssignmentStatus::Assigned,
        };
        self.by_equipment
            .entry(assignment.equipment_id)
            .or_default()
            .push(assignment.id);
        self.by_project
            .entry(assignment.project_id)
            .or_default()
            .push(assignment.id);
        self.records.insert(assignment.id, assignment.clone());
        assignment
    }

    fn get(&self, assignment_id: i32) -> AppResult<&Assignment> {
        self.records
            .get(&assignment_id)
            .ok_or_else(|| AppError::not_found(ResourceKind::Assignment, assignment_id))
    }
}

/// Storage backend kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    equipment: RwLock<BTreeMap<i32, EquipmentItem>>,
    projects: RwLock<HashMap<i32, Project>>,
    users: RwLock<HashMap<i32, User>>,
    ledger: RwLock<LedgerArena>,
    equipment_locks: Mutex<HashMap<i32, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new(fixtures: Fixtures) -> Self {
        Self {
            equipment: RwLock::new(fixtures.equipment.into_iter().map(|e| (e.id, e)).collect()),
            projects: RwLock::new(fixtures.projects.into_iter().map(|p| (p.id, p)).collect()),
            users: RwLock::new(fixtures.users.into_iter().map(|u| (u.id, u)).collect()),
            ..Default::default()
        }
    }

    async fn equipment_lock(&self, equipment_id: i32) -> Arc<Mutex<()>> {
        self.equipment_locks
            .lock()
            .await
            .entry(equipment_id)
            .or_default()
            .clone()
    }

    fn sorted_by_name(mut items: Vec<EquipmentItem>) -> Vec<EquipmentItem> {
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        items
    }
}

#[async_trait]
impl EquipmentRegistry for MemoryStore {
    async fn get_status(&self, equipment_id: i32) -> AppResult<EquipmentItem> {
        self.equipment
            .read()
            .await
            .get(&equipment_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(ResourceKind::Equipment, equipment_id))
    }

    async fn list_available(&self) -> AppResult<Vec<EquipmentItem>> {
        let equipment = self.equipment.read().await;
        let ledger = self.ledger.read().await;
        let available = equipment
            .values()
            .filter(|e| !ledger.holds_exclusive(e.id))
            .cloned()
            .collect();
        Ok(Self::sorted_by_name(available))
    }

    async fn list(&self) -> AppResult<Vec<EquipmentItem>> {
        let items = self.equipment.read().await.values().cloned().collect();
        Ok(Self::sorted_by_name(items))
    }
}

#[async_trait]
impl AssignmentLedger for MemoryStore {
    async fn find_active_assignments(&self, equipment_id: i32) -> AppResult<Vec<Assignment>> {
        Ok(self.ledger.read().await.active_for_equipment(equipment_id))
    }

    async fn create(&self, draft: &AssignmentDraft) -> AppResult<Assignment> {
        let lock = self.equipment_lock(draft.equipment_id).await;
        let _guard = lock.lock().await;

        let active = self.find_active_assignments(draft.equipment_id).await?;
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

        Ok(self.ledger.write().await.insert(draft))
    }

    async fn close(&self, assignment_id: i32, actual_return_at: DateTime<Utc>) -> AppResult<Assignment> {
        let mut ledger = self.ledger.write().await;
        let closed = apply_close(ledger.get(assignment_id)?, actual_return_at)?;
        ledger.records.insert(assignment_id, closed.clone());
        Ok(closed)
    }

    async fn get(&self, assignment_id: i32) -> AppResult<Assignment> {
        self.ledger.read().await.get(assignment_id).cloned()
    }

    async fn update(&self, assignment_id: i32, update: &AssignmentUpdate) -> AppResult<Assignment> {
        let mut ledger = self.ledger.write().await;
        let next = apply_update(ledger.get(assignment_id)?, update)?;
        ledger.records.insert(assignment_id, next.clone());
        Ok(next)
    }

    async fn list_for_equipment(
        &self,
        equipment_id: i32,
        include_returned: bool,
    ) -> AppResult<Vec<Assignment>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .records_for(ledger.by_equipment.get(&equipment_id))
            .filter(|a| include_returned || a.is_active())
            .cloned()
            .collect())
    }

    async fn list_active_for_project(&self, project_id: i32) -> AppResult<Vec<Assignment>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .records_for(ledger.by_project.get(&project_id))
            .filter(|a| a.is_active())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProjectDirectory for MemoryStore {
    async fn get_project(&self, project_id: i32) -> AppResult<Project> {
        self.projects
            .read()
            .await
            .get(&project_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(ResourceKind::Project, project_id))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn ensure_user(&self, user_id: i32) -> AppResult<()> {
        if self.users.read().await.contains_key(&user_id) {
            Ok(())
        } else {
            Err(AppError::not_found(ResourceKind::User, user_id))
        }
    }
}

#[async_trait]
impl StorageHealth for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
