//! Data models for Maintrack

pub mod assignment;
pub mod enums;
pub mod equipment;
pub mod project;
pub mod user;

// Re-export commonly used types
pub use assignment::{
    Assignment, AssignmentDraft, AssignmentRequest, AssignmentUpdate, AuthorizationDecision,
    ConflictReason, ConflictReport, DecisionReason,
};
pub use enums::{AssignmentStatus, EquipmentStatus, Rights};
pub use equipment::EquipmentItem;
pub use project::Project;
pub use user::{User, UserClaims};
