//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use maintrack_server::{
    models::{assignment::AssignmentRequest, enums::EquipmentStatus},
    repository::memory::{Fixtures, MemoryStore},
    services::Services,
};

pub const P1: i32 = 1;
pub const P2: i32 = 2;
pub const P3: i32 = 3;
pub const E1: i32 = 1;
pub const E2: i32 = 2;
pub const PLANNER: i32 = 7;

pub fn fixtures() -> Fixtures {
    Fixtures::default()
        .equipment(E1, "Compact excavator", EquipmentStatus::Operational)
        .equipment(E2, "Scissor lift", EquipmentStatus::OutOfService)
        .project(P1, "Riverside offices")
        .project(P2, "Harbour bridge retrofit")
        .project(P3, "School extension")
        .user(PLANNER, "planner")
}

pub fn services() -> Services {
    Services::new(Arc::new(MemoryStore::new(fixtures())))
}

pub fn request(equipment_id: i32, project_id: i32) -> AssignmentRequest {
    AssignmentRequest {
        equipment_id,
        project_id,
        is_shared: false,
        authorization_code: None,
        assigned_by: PLANNER,
        expected_return_at: None,
        notes: None,
    }
}

pub fn shared_request(equipment_id: i32, project_id: i32, code: &str) -> AssignmentRequest {
    AssignmentRequest {
        is_shared: true,
        authorization_code: Some(code.to_string()),
        ..request(equipment_id, project_id)
    }
}
