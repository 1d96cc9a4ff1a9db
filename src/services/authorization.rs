//! Authorization gate for requests targeting already-assigned equipment

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::assignment::{AuthorizationDecision, DecisionReason},
    repository::AssignmentLedger,
};

/// Pure decision over ledger reads; never writes
#[derive(Clone)]
pub struct AuthorizationGate {
    ledger: Arc<dyn AssignmentLedger>,
}

impl AuthorizationGate {
    pub fn new(ledger: Arc<dyn AssignmentLedger>) -> Self {
        Self { ledger }
    }

    /// Decide whether `requested_by` may be assigned `equipment_id`.
    ///
    /// Codes are compared case-sensitively. When there is no conflict the code is not
    /// checked: a shared request simply stores it for later requests to match.
    pub async fn evaluate(
        &self,
        equipment_id: i32,
        requested_by: i32,
        supplied_code: Option<&str>,
    ) -> AppResult<AuthorizationDecision> {
        let active = self.ledger.find_active_assignments(equipment_id).await?;

        if active.is_empty() {
            return Ok(AuthorizationDecision::allow(DecisionReason::NoConflict, None));
        }

        if let Some(own) = active.iter().find(|a| a.project_id == requested_by) {
            return Ok(AuthorizationDecision::allow(
                DecisionReason::SameProject,
                Some(own.clone()),
            ));
        }

        if let Some(exclusive) = active.iter().find(|a| !a.is_shared) {
            return Ok(AuthorizationDecision::deny(
                DecisionReason::ExclusiveConflict,
                exclusive.clone(),
            ));
        }

        // Every holder is shared; they all carry the group's code.
        let holder = active[0].clone();
        let matches = match (supplied_code, holder.authorization_code.as_deref()) {
            (Some(supplied), Some(stored)) => supplied == stored,
            _ => false,
        };

        if matches {
            Ok(AuthorizationDecision::allow(
                DecisionReason::SharedAuthorized,
                Some(holder),
            ))
        } else {
            Ok(AuthorizationDecision::deny(
                DecisionReason::SharedCodeInvalid,
                holder,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;

    use crate::{
        error::AppError,
        models::{assignment::Assignment, enums::AssignmentStatus},
        repository::MockAssignmentLedger,
    };

    fn held_by(id: i32, project_id: i32, code: Option<&str>) -> Assignment {
        Assignment {
            id,
            equipment_id: 1,
            project_id,
            assigned_at: Utc::now(),
            expected_return_at: None,
            actual_return_at: None,
            assigned_by: 1,
            is_shared: code.is_some(),
            authorization_code: code.map(str::to_string),
            notes: None,
            status: AssignmentStatus::Assigned,
        }
    }

    fn gate_with(active: Vec<Assignment>) -> AuthorizationGate {
        let mut ledger = MockAssignmentLedger::new();
        ledger
            .expect_find_active_assignments()
            .with(eq(1))
            .times(1)
            .returning(move |_| Ok(active.clone()));
        AuthorizationGate::new(Arc::new(ledger))
    }

    #[tokio::test]
    async fn test_unassigned_equipment_has_no_conflict() {
        let decision = gate_with(vec![]).evaluate(1, 10, None).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.reason, DecisionReason::NoConflict);
        assert!(decision.conflicting_assignment.is_none());
    }

    #[tokio::test]
    async fn test_own_assignment_is_update_in_place() {
        let decision = gate_with(vec![held_by(5, 10, None)])
            .evaluate(1, 10, None)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.reason, DecisionReason::SameProject);
        assert_eq!(decision.conflicting_assignment.map(|a| a.id), Some(5));
    }

    #[tokio::test]
    async fn test_exclusive_holder_denies_even_with_code() {
        let decision = gate_with(vec![held_by(5, 10, None)])
            .evaluate(1, 20, Some("X"))
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::ExclusiveConflict);
        assert_eq!(decision.conflicting_assignment.map(|a| a.project_id), Some(10));
    }

    #[tokio::test]
    async fn test_shared_holder_with_matching_code() {
        let decision = gate_with(vec![held_by(5, 10, Some("ABC123"))])
            .evaluate(1, 20, Some("ABC123"))
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.reason, DecisionReason::SharedAuthorized);
    }

    #[tokio::test]
    async fn test_shared_code_is_case_sensitive() {
        let decision = gate_with(vec![held_by(5, 10, Some("ABC123"))])
            .evaluate(1, 20, Some("abc123"))
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::SharedCodeInvalid);
    }

    #[tokio::test]
    async fn test_shared_holder_without_code() {
        let decision = gate_with(vec![held_by(6, 30, Some("K")), held_by(5, 10, Some("K"))])
            .evaluate(1, 20, None)
            .await
            .unwrap();
        assert_eq!(decision.reason, DecisionReason::SharedCodeInvalid);
        assert_eq!(decision.conflicting_assignment.map(|a| a.id), Some(6));
    }

    #[tokio::test]
    async fn test_ledger_errors_propagate() {
        let mut ledger = MockAssignmentLedger::new();
        ledger
            .expect_find_active_assignments()
            .returning(|_| Err(AppError::Internal("storage down".to_string())));
        let gate = AuthorizationGate::new(Arc::new(ledger));
        assert!(matches!(
            gate.evaluate(1, 10, None).await,
            Err(AppError::Internal(_))
        ));
    }
}
