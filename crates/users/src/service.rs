//! User-management operations guarded by the policy evaluator.
//!
//! Order of checks for every operation:
//! 1. the actor must be active;
//! 2. the target is resolved from storage (unknown target → `NotFound`);
//! 3. the policy decides, with the stored record as target;
//! 4. storage is touched.

use std::sync::Arc;

use chrono::Utc;

use deptguard_auth::{
    Action, AuthzError, EvaluationRequest, PolicyEvaluator, Principal, SharedPolicy, Status,
    TargetRoles, authorize,
};
use deptguard_core::PrincipalId;

use crate::error::UserServiceError;
use crate::record::{NewUser, UserRecord, UserUpdate, normalize_email};
use crate::store::PrincipalStore;

pub struct UserService<S> {
    store: S,
    policy: Arc<SharedPolicy>,
}

impl<S> UserService<S>
where
    S: PrincipalStore,
{
    pub fn new(store: S, policy: Arc<SharedPolicy>) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register an account. The proposed record is the policy target, so a
    /// department head can only create general staff in their own department.
    pub fn register_user(
        &self,
        actor: &Principal,
        input: NewUser,
    ) -> Result<UserRecord, UserServiceError> {
        let evaluator = self.evaluator_for(actor)?;
        let record = input.into_record(Utc::now())?;
        let target = record.principal();

        self.check(
            &evaluator,
            &EvaluationRequest::new(actor, Action::Create).with_target(&target),
        )?;
        self.store.insert(record.clone())?;

        tracing::info!(
            actor = %actor.id,
            user = %record.id,
            role = %record.role,
            "user registered"
        );
        Ok(record)
    }

    pub fn get_user_by_id(
        &self,
        actor: &Principal,
        id: &PrincipalId,
    ) -> Result<UserRecord, UserServiceError> {
        let evaluator = self.evaluator_for(actor)?;
        let record = self.require(id)?;
        let target = record.principal();
        self.check(
            &evaluator,
            &EvaluationRequest::new(actor, Action::Read).with_target(&target),
        )?;
        Ok(record)
    }

    pub fn get_user_by_email(
        &self,
        actor: &Principal,
        email: &str,
    ) -> Result<UserRecord, UserServiceError> {
        let evaluator = self.evaluator_for(actor)?;
        let email = normalize_email(email)?;
        let record = self
            .store
            .get_by_email(&email)?
            .ok_or_else(|| UserServiceError::NotFound(email.clone()))?;
        let target = record.principal();
        self.check(
            &evaluator,
            &EvaluationRequest::new(actor, Action::Read).with_target(&target),
        )?;
        Ok(record)
    }

    /// Every record the actor may read; the rest are silently omitted.
    pub fn list_users(&self, actor: &Principal) -> Result<Vec<UserRecord>, UserServiceError> {
        let evaluator = self.evaluator_for(actor)?;
        let visible = self
            .store
            .list()?
            .into_iter()
            .filter(|record| {
                let target = record.principal();
                let request = EvaluationRequest::new(actor, Action::Read).with_target(&target);
                evaluator.evaluate(&request)
            })
            .collect();
        Ok(visible)
    }

    /// Apply a profile update.
    ///
    /// The policy is asked about the stored record and, when the update moves
    /// the account to another role or department, about the result as well:
    /// nobody may move an account somewhere they could not manage it. A rule
    /// scoped to the actor's own account never grants such a move.
    pub fn update_user(
        &self,
        actor: &Principal,
        id: &PrincipalId,
        update: &UserUpdate,
    ) -> Result<UserRecord, UserServiceError> {
        let evaluator = self.evaluator_for(actor)?;
        let current = self.require(id)?;
        let target = current.principal();
        self.check(
            &evaluator,
            &EvaluationRequest::new(actor, Action::Update).with_target(&target),
        )?;

        let updated = update.apply(&current, Utc::now())?;
        if updated.role != current.role || updated.department != current.department {
            let moved = updated.principal();
            let current_request =
                EvaluationRequest::new(actor, Action::Update).with_target(&target);
            let moved_request = EvaluationRequest::new(actor, Action::Update).with_target(&moved);

            self.check(&evaluator, &moved_request)?;
            for request in [&current_request, &moved_request] {
                if granted_by_self_rule(&evaluator, request) {
                    tracing::warn!(
                        actor = %actor.id,
                        user = %current.id,
                        "self-scoped rule cannot move an account"
                    );
                    return Err(forbidden(request).into());
                }
            }
        }

        self.store.update(&updated)?;
        tracing::info!(actor = %actor.id, user = %updated.id, "user updated");
        Ok(updated)
    }

    pub fn delete_user(
        &self,
        actor: &Principal,
        id: &PrincipalId,
    ) -> Result<UserRecord, UserServiceError> {
        let evaluator = self.evaluator_for(actor)?;
        let current = self.require(id)?;
        let target = current.principal();
        self.check(
            &evaluator,
            &EvaluationRequest::new(actor, Action::Delete).with_target(&target),
        )?;

        let removed = self.store.delete(id)?;
        tracing::info!(actor = %actor.id, user = %removed.id, "user deleted");
        Ok(removed)
    }

    /// Move an account to `new_status`, checked as the transition
    /// `(stored status → new_status)`.
    pub fn change_user_status(
        &self,
        actor: &Principal,
        id: &PrincipalId,
        new_status: Status,
    ) -> Result<UserRecord, UserServiceError> {
        let evaluator = self.evaluator_for(actor)?;
        let current = self.require(id)?;
        let target = current.principal();
        self.check(
            &evaluator,
            &EvaluationRequest::new(actor, Action::ChangeStatus)
                .with_target(&target)
                .with_proposed_status(new_status),
        )?;

        let mut updated = current;
        updated.status = new_status;
        updated.updated_at = Utc::now();
        self.store.update(&updated)?;

        tracing::info!(
            actor = %actor.id,
            user = %updated.id,
            status = %new_status,
            "user status changed"
        );
        Ok(updated)
    }

    fn evaluator_for(&self, actor: &Principal) -> Result<PolicyEvaluator, UserServiceError> {
        if !actor.is_active() {
            tracing::warn!(actor = %actor.id, "inactive principal attempted an operation");
            return Err(UserServiceError::InactiveActor(actor.id.clone()));
        }
        Ok(self.policy.evaluator())
    }

    fn require(&self, id: &PrincipalId) -> Result<UserRecord, UserServiceError> {
        self.store
            .get_by_id(id)?
            .ok_or_else(|| UserServiceError::NotFound(id.to_string()))
    }

    fn check(
        &self,
        evaluator: &PolicyEvaluator,
        request: &EvaluationRequest<'_>,
    ) -> Result<(), UserServiceError> {
        authorize(evaluator, request).map_err(|err| {
            tracing::warn!(
                actor = %request.actor.id,
                action = %request.action,
                target = request.target.map(|t| t.id.as_str()),
                "permission denied"
            );
            UserServiceError::from(err)
        })
    }
}

fn granted_by_self_rule(evaluator: &PolicyEvaluator, request: &EvaluationRequest<'_>) -> bool {
    evaluator
        .matching_rule(request)
        .and_then(|index| evaluator.registry().get(index))
        .is_some_and(|rule| matches!(rule.target_roles, TargetRoles::SelfOnly))
}

fn forbidden(request: &EvaluationRequest<'_>) -> AuthzError {
    AuthzError::Forbidden {
        actor: request.actor.id.clone(),
        action: request.action,
    }
}
