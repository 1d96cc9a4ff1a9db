//! Assignment coordinator
//!
//! Each request moves through `Received -> Checked -> Authorized -> Committed` or
//! `Received -> Checked -> Denied -> Reported`. Both end states are terminal; a caller that
//! receives `race_lost` re-issues the request itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use super::authorization::AuthorizationGate;
use crate::{
    error::{AppError, AppResult},
    models::assignment::{
        Assignment, AssignmentDetails, AssignmentDraft, AssignmentRequest, AssignmentUpdate,
        AuthorizationDecision, ConflictReason, ConflictReport, DecisionReason,
    },
    repository::{AssignmentLedger, EquipmentRegistry, ProjectDirectory, UserDirectory},
};

/// Request lifecycle stage, used for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Checked,
    Authorized,
    Committed,
    Denied,
    Reported,
}

#[derive(Clone)]
pub struct AssignmentCoordinator {
    registry: Arc<dyn EquipmentRegistry>,
    ledger: Arc<dyn AssignmentLedger>,
    projects: Arc<dyn ProjectDirectory>,
    users: Arc<dyn UserDirectory>,
    gate: AuthorizationGate,
}

impl AssignmentCoordinator {
    pub fn new(
        registry: Arc<dyn EquipmentRegistry>,
        ledger: Arc<dyn AssignmentLedger>,
        projects: Arc<dyn ProjectDirectory>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let gate = AuthorizationGate::new(ledger.clone());
        Self {
            registry,
            ledger,
            projects,
            users,
            gate,
        }
    }

    /// Assign equipment to a project.
    ///
    /// Denials come back as `AppError::Conflict` carrying a `ConflictReport`.
    pub async fn request_assignment(&self, request: AssignmentRequest) -> AppResult<Assignment> {
        let equipment_id = request.equipment_id;
        let project_id = request.project_id;
        trace_stage(Stage::Received, equipment_id, project_id);

        request.validate()?;
        self.registry.get_status(equipment_id).await?;
        self.projects.get_project(project_id).await?;
        self.users.ensure_user(request.assigned_by).await?;

        let decision = self
            .gate
            .evaluate(equipment_id, project_id, request.authorization_code.as_deref())
            .await?;
        trace_stage(Stage::Checked, equipment_id, project_id);

        if !decision.allowed {
            trace_stage(Stage::Denied, equipment_id, project_id);
            let report = self.report_denial(&decision).await?;
            tracing::warn!(
                "Assignment of equipment {} to project {} denied: {} (held by project {})",
                equipment_id,
                project_id,
                report.reason,
                report.conflicting_project_id
            );
            trace_stage(Stage::Reported, equipment_id, project_id);
            return Err(AppError::Conflict(report));
        }

        if decision.reason == DecisionReason::SameProject {
            if let Some(own) = decision.conflicting_assignment {
                return self.update_in_place(own, request).await;
            }
        }

        trace_stage(Stage::Authorized, equipment_id, project_id);
        let draft = build_draft(request, &decision);

        match self.ledger.create(&draft).await {
            Ok(assignment) => {
                trace_stage(Stage::Committed, equipment_id, project_id);
                tracing::info!(
                    "Equipment {} assigned to project {} (assignment {}, shared: {})",
                    equipment_id,
                    project_id,
                    assignment.id,
                    assignment.is_shared
                );
                Ok(assignment)
            }
            Err(AppError::LedgerConflict { blocking }) => {
                trace_stage(Stage::Denied, equipment_id, project_id);
                let report = self.report(&blocking, ConflictReason::RaceLost).await?;
                tracing::warn!(
                    "Assignment of equipment {} to project {} lost the commit race to assignment {}",
                    equipment_id,
                    project_id,
                    blocking.id
                );
                trace_stage(Stage::Reported, equipment_id, project_id);
                Err(AppError::Conflict(report))
            }
            Err(e) => Err(e),
        }
    }

    /// Close an assignment. Permission checks belong to the caller.
    pub async fn release_assignment(
        &self,
        assignment_id: i32,
        actual_return_at: DateTime<Utc>,
    ) -> AppResult<Assignment> {
        let closed = self.ledger.close(assignment_id, actual_return_at).await?;
        tracing::info!(
            "Assignment {} released (equipment {}, project {})",
            closed.id,
            closed.equipment_id,
            closed.project_id
        );
        Ok(closed)
    }

    pub async fn update_assignment(
        &self,
        assignment_id: i32,
        update: AssignmentUpdate,
    ) -> AppResult<Assignment> {
        update.validate()?;
        self.ledger.update(assignment_id, &update).await
    }

    pub async fn get_assignment(&self, assignment_id: i32) -> AppResult<AssignmentDetails> {
        let assignment = self.ledger.get(assignment_id).await?;
        Ok(AssignmentDetails::from_assignment(assignment, Utc::now()))
    }

    /// Active assignments of an equipment item, or its full history
    pub async fn equipment_assignments(
        &self,
        equipment_id: i32,
        include_returned: bool,
    ) -> AppResult<Vec<AssignmentDetails>> {
        self.registry.get_status(equipment_id).await?;
        let assignments = self
            .ledger
            .list_for_equipment(equipment_id, include_returned)
            .await?;
        Ok(with_details(assignments))
    }

    pub async fn project_assignments(&self, project_id: i32) -> AppResult<Vec<AssignmentDetails>> {
        self.projects.get_project(project_id).await?;
        let assignments = self.ledger.list_active_for_project(project_id).await?;
        Ok(with_details(assignments))
    }

    /// The requesting project already holds the equipment: refresh its record instead of
    /// inserting a second one. Changing the sharing mode or the code of a shared record needs
    /// a release and a new request.
    async fn update_in_place(&self, own: Assignment, request: AssignmentRequest) -> AppResult<Assignment> {
        let supplied = request.authorization_code.as_deref();
        let same_code = own.is_shared && supplied == own.authorization_code.as_deref();
        // An unshared request carrying the group's code is how the record joined the group
        let requests_shared = request.is_shared || same_code;

        if own.is_shared != requests_shared {
            return Err(AppError::Validation(format!(
                "Project {} already holds equipment {} ({}); release it before changing the sharing mode",
                own.project_id,
                own.equipment_id,
                if own.is_shared { "shared" } else { "exclusive" }
            )));
        }

        if own.is_shared && !same_code {
            return Err(AppError::Validation(format!(
                "Assignment {} is shared under another authorization code; release it before changing the code",
                own.id
            )));
        }

        let update = AssignmentUpdate {
            expected_return_at: request.expected_return_at,
            notes: request.notes,
            status: None,
        };
        if update.is_empty() {
            return Ok(own);
        }

        tracing::info!(
            "Project {} already holds equipment {}; updating assignment {} in place",
            own.project_id,
            own.equipment_id,
            own.id
        );
        self.ledger.update(own.id, &update).await
    }

    async fn report_denial(&self, decision: &AuthorizationDecision) -> AppResult<ConflictReport> {
        let reason = match decision.reason {
            DecisionReason::SharedCodeInvalid => ConflictReason::SharedCodeInvalid,
            _ => ConflictReason::ExclusiveConflict,
        };
        let blocking = decision.conflicting_assignment.as_ref().ok_or_else(|| {
            AppError::Internal("Denied decision without a conflicting assignment".to_string())
        })?;
        self.report(blocking, reason).await
    }

    async fn report(&self, blocking: &Assignment, reason: ConflictReason) -> AppResult<ConflictReport> {
        let project = self.projects.get_project(blocking.project_id).await?;
        Ok(ConflictReport {
            conflicting_project_id: project.id,
            conflicting_project_name: project.name,
            is_shared: blocking.is_shared,
            expected_return_at: blocking.expected_return_at,
            reason,
        })
    }
}

/// A request joining a shared group is committed as shared under the group's code,
/// whatever its own `is_shared` flag says. A non-shared request stores no code.
fn build_draft(request: AssignmentRequest, decision: &AuthorizationDecision) -> AssignmentDraft {
    let joins_group = decision.reason == DecisionReason::SharedAuthorized;
    let is_shared = request.is_shared || joins_group;
    let authorization_code = if joins_group {
        decision
            .conflicting_assignment
            .as_ref()
            .and_then(|a| a.authorization_code.clone())
    } else if is_shared {
        request.authorization_code
    } else {
        None
    };

    AssignmentDraft {
        equipment_id: request.equipment_id,
        project_id: request.project_id,
        assigned_by: request.assigned_by,
        is_shared,
        authorization_code,
        expected_return_at: request.expected_return_at,
        notes: request.notes,
    }
}

fn with_details(assignments: Vec<Assignment>) -> Vec<AssignmentDetails> {
    let now = Utc::now();
    assignments
        .into_iter()
        .map(|a| AssignmentDetails::from_assignment(a, now))
        .collect()
}

fn trace_stage(stage: Stage, equipment_id: i32, project_id: i32) {
    tracing::debug!(?stage, equipment_id, project_id, "assignment request");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::{
        error::ResourceKind,
        models::enums::{AssignmentStatus, EquipmentStatus},
        repository::memory::{Fixtures, MemoryStore},
    };

    fn coordinator() -> AssignmentCoordinator {
        let store = Arc::new(MemoryStore::new(
            Fixtures::default()
                .equipment(1, "Concrete mixer", EquipmentStatus::Operational)
                .equipment(2, "Generator", EquipmentStatus::Maintenance)
                .project(10, "North site")
                .project(20, "South site")
                .project(30, "East site")
                .user(1, "planner"),
        ));
        AssignmentCoordinator::new(store.clone(), store.clone(), store.clone(), store)
    }

    fn request(equipment_id: i32, project_id: i32, code: Option<&str>) -> AssignmentRequest {
        AssignmentRequest {
            equipment_id,
            project_id,
            is_shared: code.is_some(),
            authorization_code: code.map(str::to_string),
            assigned_by: 1,
            expected_return_at: None,
            notes: None,
        }
    }

    fn conflict_reason(err: AppError) -> ConflictReason {
        match err {
            AppError::Conflict(report) => report.reason,
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unassigned_equipment_commits_either_mode() {
        let c = coordinator();
        let exclusive = c.request_assignment(request(1, 10, None)).await.unwrap();
        assert!(!exclusive.is_shared);
        assert!(exclusive.authorization_code.is_none());
        assert_eq!(exclusive.status, AssignmentStatus::Assigned);

        let shared = c.request_assignment(request(2, 10, Some("K1"))).await.unwrap();
        assert!(shared.is_shared);
        assert_eq!(shared.authorization_code.as_deref(), Some("K1"));
    }

    #[tokio::test]
    async fn test_code_ignored_for_exclusive_request() {
        let c = coordinator();
        let mut req = request(1, 10, None);
        req.authorization_code = Some("unused".to_string());
        let a = c.request_assignment(req).await.unwrap();
        assert!(!a.is_shared);
        assert!(a.authorization_code.is_none());
    }

    #[tokio::test]
    async fn test_exclusive_conflict_names_holder() {
        let c = coordinator();
        let mut first = request(1, 10, None);
        first.expected_return_at = Some(Utc::now() + Duration::days(3));
        c.request_assignment(first).await.unwrap();

        match c.request_assignment(request(1, 20, None)).await.unwrap_err() {
            AppError::Conflict(report) => {
                assert_eq!(report.conflicting_project_id, 10);
                assert_eq!(report.conflicting_project_name, "North site");
                assert!(!report.is_shared);
                assert!(report.expected_return_at.is_some());
                assert_eq!(report.reason, ConflictReason::ExclusiveConflict);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shared_coexistence() {
        let c = coordinator();
        c.request_assignment(request(1, 10, Some("ABC123"))).await.unwrap();

        let err = c.request_assignment(request(1, 20, Some("WRONG"))).await.unwrap_err();
        assert_eq!(conflict_reason(err), ConflictReason::SharedCodeInvalid);

        let joined = c.request_assignment(request(1, 20, Some("ABC123"))).await.unwrap();
        assert!(joined.is_shared);
        assert_eq!(c.ledger.find_active_assignments(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_joining_shared_group_without_share_flag() {
        let c = coordinator();
        c.request_assignment(request(1, 10, Some("ABC123"))).await.unwrap();

        let mut req = request(1, 20, None);
        req.authorization_code = Some("ABC123".to_string());
        let joined = c.request_assignment(req).await.unwrap();
        assert!(joined.is_shared);
        assert_eq!(joined.authorization_code.as_deref(), Some("ABC123"));
    }

    #[tokio::test]
    async fn test_repeated_join_without_share_flag_stays_in_place() {
        let c = coordinator();
        c.request_assignment(request(1, 10, Some("ABC123"))).await.unwrap();

        let mut req = request(1, 20, None);
        req.authorization_code = Some("ABC123".to_string());
        let joined = c.request_assignment(req.clone()).await.unwrap();

        req.notes = Some("second shift".to_string());
        let again = c.request_assignment(req).await.unwrap();
        assert_eq!(again.id, joined.id);
        assert!(again.is_shared);
        assert_eq!(again.notes.as_deref(), Some("second shift"));
        assert_eq!(c.ledger.find_active_assignments(1).await.unwrap().len(), 2);

        // Dropping the code is a request to hold it exclusively
        let err = c.request_assignment(request(1, 20, None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_shared_holder_cannot_swap_code() {
        let c = coordinator();
        let held = c.request_assignment(request(1, 10, Some("ABC123"))).await.unwrap();

        let err = c.request_assignment(request(1, 10, Some("OTHER"))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stored = c.ledger.get(held.id).await.unwrap();
        assert_eq!(stored.authorization_code.as_deref(), Some("ABC123"));

        let same = c.request_assignment(request(1, 10, Some("ABC123"))).await.unwrap();
        assert_eq!(same.id, held.id);
    }

    #[tokio::test]
    async fn test_empty_code_ignored_for_exclusive_request() {
        let c = coordinator();
        let mut req = request(1, 10, None);
        req.authorization_code = Some(String::new());
        let a = c.request_assignment(req).await.unwrap();
        assert!(!a.is_shared);
        assert!(a.authorization_code.is_none());
    }

    #[tokio::test]
    async fn test_shared_request_requires_code() {
        let c = coordinator();
        let mut req = request(1, 10, None);
        req.is_shared = true;
        assert!(matches!(
            c.request_assignment(req).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_references_are_not_found() {
        let c = coordinator();
        assert!(matches!(
            c.request_assignment(request(9, 10, None)).await,
            Err(AppError::NotFound { kind: ResourceKind::Equipment, id: 9 })
        ));
        assert!(matches!(
            c.request_assignment(request(1, 99, None)).await,
            Err(AppError::NotFound { kind: ResourceKind::Project, id: 99 })
        ));
        let mut req = request(1, 10, None);
        req.assigned_by = 42;
        assert!(matches!(
            c.request_assignment(req).await,
            Err(AppError::NotFound { kind: ResourceKind::User, id: 42 })
        ));
    }

    #[tokio::test]
    async fn test_same_project_updates_in_place() {
        let c = coordinator();
        let first = c.request_assignment(request(1, 10, None)).await.unwrap();

        let mut again = request(1, 10, None);
        again.notes = Some("extended".to_string());
        let updated = c.request_assignment(again).await.unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.notes.as_deref(), Some("extended"));
        assert_eq!(c.ledger.find_active_assignments(1).await.unwrap().len(), 1);

        let err = c.request_assignment(request(1, 10, Some("X"))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_release_then_release_again() {
        let c = coordinator();
        let a = c.request_assignment(request(1, 10, None)).await.unwrap();

        let closed = c.release_assignment(a.id, Utc::now()).await.unwrap();
        assert_eq!(closed.status, AssignmentStatus::Returned);
        assert!(c.ledger.find_active_assignments(1).await.unwrap().is_empty());
        assert!(matches!(
            c.release_assignment(a.id, Utc::now()).await,
            Err(AppError::AlreadyClosed { .. })
        ));

        // Released equipment is free again
        c.request_assignment(request(1, 20, None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_listings() {
        let c = coordinator();
        let a = c.request_assignment(request(1, 10, None)).await.unwrap();
        c.request_assignment(request(2, 10, None)).await.unwrap();

        let in_use = c
            .update_assignment(
                a.id,
                AssignmentUpdate {
                    status: Some(AssignmentStatus::InUse),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(in_use.status, AssignmentStatus::InUse);

        assert_eq!(c.project_assignments(10).await.unwrap().len(), 2);
        c.release_assignment(a.id, Utc::now()).await.unwrap();
        assert_eq!(c.project_assignments(10).await.unwrap().len(), 1);
        assert!(c.equipment_assignments(1, false).await.unwrap().is_empty());
        assert_eq!(c.equipment_assignments(1, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overdue_flag() {
        let c = coordinator();
        let a = c.request_assignment(request(1, 10, None)).await.unwrap();
        c.update_assignment(
            a.id,
            AssignmentUpdate {
                expected_return_at: Some(a.assigned_at + Duration::milliseconds(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(c.get_assignment(a.id).await.unwrap().is_overdue);
    }
}
