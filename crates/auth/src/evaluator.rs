//! Policy evaluation: first passing rule wins.
//!
//! 1. The *applicable set* is every rule whose `roles_allowed` contains the
//!    actor's role and whose `actions_allowed` contains the requested action.
//! 2. Applicable rules are scanned in declaration order; each must pass the
//!    target-role, target-department and status-transition gates.
//! 3. The first rule passing all gates grants. A rule that fails a gate does not
//!    stop the scan.
//!
//! Evaluation is pure: no IO, no shared mutable state, and no errors. Missing
//! information (no target, no proposed status) fails the gate that needs it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Action, PermissionRule, PolicyRegistry, Principal, Status};

/// Outcome of an evaluation: `true` grants, `false` denies.
pub type Decision = bool;

/// One of the three per-rule constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    TargetRole,
    TargetDepartment,
    StatusTransition,
}

impl core::fmt::Display for Gate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Gate::TargetRole => "target role",
            Gate::TargetDepartment => "target department",
            Gate::StatusTransition => "status transition",
        })
    }
}

/// A single authorization question.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub actor: &'a Principal,
    pub action: Action,
    pub target: Option<&'a Principal>,
    pub proposed_status: Option<Status>,
}

impl<'a> EvaluationRequest<'a> {
    pub fn new(actor: &'a Principal, action: Action) -> Self {
        Self {
            actor,
            action,
            target: None,
            proposed_status: None,
        }
    }

    pub fn with_target(mut self, target: &'a Principal) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_proposed_status(mut self, status: Status) -> Self {
        self.proposed_status = Some(status);
        self
    }
}

/// Owned form of [`EvaluationRequest`], for requests read from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestRecord {
    pub actor: Principal,
    pub action: Action,
    #[serde(default)]
    pub target: Option<Principal>,
    #[serde(default)]
    pub proposed_status: Option<Status>,
}

impl RequestRecord {
    pub fn as_request(&self) -> EvaluationRequest<'_> {
        EvaluationRequest {
            actor: &self.actor,
            action: self.action,
            target: self.target.as_ref(),
            proposed_status: self.proposed_status,
        }
    }
}

/// Decides requests against one registry snapshot.
///
/// The registry is injected, never looked up globally, so tests and callers can
/// run alternative tables side by side.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    registry: Arc<PolicyRegistry>,
}

impl PolicyEvaluator {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Positional form of [`PolicyEvaluator::evaluate`].
    pub fn can_perform_action(
        &self,
        actor: &Principal,
        action: Action,
        target: Option<&Principal>,
        proposed_status: Option<Status>,
    ) -> Decision {
        self.evaluate(&EvaluationRequest {
            actor,
            action,
            target,
            proposed_status,
        })
    }

    pub fn evaluate(&self, request: &EvaluationRequest<'_>) -> Decision {
        let matched = self.matching_rule(request);
        tracing::debug!(
            actor = %request.actor.id,
            action = %request.action,
            target = request.target.map(|t| t.id.as_str()),
            granted = matched.is_some(),
            rule = matched,
            "policy decision"
        );
        matched.is_some()
    }

    /// Index of the rule that grants `request`, if any.
    pub fn matching_rule(&self, request: &EvaluationRequest<'_>) -> Option<usize> {
        self.applicable_rules(request)
            .find(|(_, rule)| check_gates(rule, request).is_ok())
            .map(|(index, _)| index)
    }

    /// Rules whose role + action predicate matches, with their registry index.
    pub fn applicable_rules<'s>(
        &'s self,
        request: &EvaluationRequest<'_>,
    ) -> impl Iterator<Item = (usize, &'s PermissionRule)> + 's {
        let role = request.actor.role;
        let action = request.action;
        self.registry
            .rules()
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.applies_to(role, action))
    }
}

/// Run the three gates of `rule` in order, reporting the first that fails.
pub fn check_gates(rule: &PermissionRule, request: &EvaluationRequest<'_>) -> Result<(), Gate> {
    if !rule.target_roles.admits(request.actor, request.target) {
        return Err(Gate::TargetRole);
    }
    if !rule.target_departments.admits(request.actor, request.target) {
        return Err(Gate::TargetDepartment);
    }
    if !rule.admits_transition(request.action, request.target, request.proposed_status) {
        return Err(Gate::StatusTransition);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Department, Role, StatusTransition};
    use deptguard_core::PrincipalId;
    use proptest::prelude::*;

    fn principal(id: &str, role: Role, department: Department) -> Principal {
        Principal::new(PrincipalId::parse(id).unwrap(), role, department)
    }

    fn evaluator(rules: Vec<PermissionRule>) -> PolicyEvaluator {
        PolicyEvaluator::new(Arc::new(PolicyRegistry::from_rules(rules).unwrap()))
    }

    fn builtin() -> PolicyEvaluator {
        PolicyEvaluator::new(Arc::new(PolicyRegistry::builtin()))
    }

    #[test]
    fn empty_applicable_set_denies() {
        let eval = builtin();
        let general = principal("u1", Role::General, Department::Sales);

        assert!(!eval.can_perform_action(&general, Action::Delete, Some(&general), None));
        assert!(!eval.can_perform_action(&general, Action::Create, None, None));
    }

    #[test]
    fn empty_registry_denies_everything() {
        let eval = evaluator(vec![]);
        let admin = principal("a", Role::Admin, Department::It);
        for action in Action::ALL {
            assert!(!eval.can_perform_action(&admin, *action, None, None));
        }
    }

    #[test]
    fn scan_continues_past_rules_failing_a_gate() {
        let eval = evaluator(vec![
            PermissionRule::new([Role::DepartmentHead], [Action::Update]).targeting_self(),
            PermissionRule::new([Role::DepartmentHead], [Action::Update])
                .targeting_same_department(),
        ]);
        let head = principal("h", Role::DepartmentHead, Department::Hr);
        let staff = principal("s", Role::General, Department::Hr);

        let request = EvaluationRequest::new(&head, Action::Update).with_target(&staff);
        assert_eq!(eval.matching_rule(&request), Some(1));
        assert!(eval.evaluate(&request));
    }

    #[test]
    fn first_passing_rule_wins() {
        let eval = evaluator(vec![
            PermissionRule::new([Role::Admin], [Action::Read]),
            PermissionRule::new([Role::Admin], [Action::Read]).targeting_self(),
        ]);
        let admin = principal("a", Role::Admin, Department::It);
        let request = EvaluationRequest::new(&admin, Action::Read).with_target(&admin);
        assert_eq!(eval.matching_rule(&request), Some(0));
    }

    #[test]
    fn change_status_without_proposed_status_is_denied() {
        let eval = builtin();
        let general = principal("u1", Role::General, Department::Sales);
        let request = EvaluationRequest::new(&general, Action::ChangeStatus).with_target(&general);
        assert!(!eval.evaluate(&request));
    }

    #[test]
    fn change_status_rule_without_transitions_allows_any_direction() {
        let eval = evaluator(vec![
            PermissionRule::new([Role::DepartmentHead], [Action::ChangeStatus])
                .targeting_same_department(),
        ]);
        let head = principal("h", Role::DepartmentHead, Department::Finance);
        let staff = principal("s", Role::General, Department::Finance);
        let inactive = staff.clone().with_status(Status::Inactive);

        assert!(eval.can_perform_action(
            &head,
            Action::ChangeStatus,
            Some(&staff),
            Some(Status::Inactive),
        ));
        assert!(eval.can_perform_action(
            &head,
            Action::ChangeStatus,
            Some(&inactive),
            Some(Status::Active),
        ));
    }

    #[test]
    fn transitions_are_listed_per_direction() {
        let eval = evaluator(vec![
            PermissionRule::new([Role::Admin], [Action::ChangeStatus])
                .allowing_status_changes([StatusTransition::new(Status::Active, Status::Inactive)]),
        ]);
        let admin = principal("a", Role::Admin, Department::It);
        let active = principal("t", Role::General, Department::It);
        let inactive = active.clone().with_status(Status::Inactive);

        assert!(eval.can_perform_action(
            &admin,
            Action::ChangeStatus,
            Some(&active),
            Some(Status::Inactive),
        ));
        assert!(!eval.can_perform_action(
            &admin,
            Action::ChangeStatus,
            Some(&inactive),
            Some(Status::Active),
        ));
    }

    #[test]
    fn department_head_needs_target_for_scoped_rule() {
        let eval = builtin();
        let head = principal("h", Role::DepartmentHead, Department::Hr);
        assert!(!eval.can_perform_action(&head, Action::Read, None, None));
    }

    #[test]
    fn request_record_reads_camel_case_json() {
        let record: RequestRecord = serde_json::from_str(
            r#"{
                "actor": { "id": "u1", "role": "GENERAL", "department": "SALES" },
                "action": "CHANGE_STATUS",
                "target": {
                    "id": "u1", "role": "GENERAL", "department": "SALES", "status": "ACTIVE"
                },
                "proposedStatus": "INACTIVE"
            }"#,
        )
        .unwrap();

        assert!(builtin().evaluate(&record.as_request()));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL)
    }

    fn any_department() -> impl Strategy<Value = Department> {
        prop::sample::select(Department::ALL)
    }

    fn any_status() -> impl Strategy<Value = Status> {
        prop::sample::select(Status::ALL)
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL)
    }

    fn any_principal() -> impl Strategy<Value = Principal> {
        (prop::sample::select(vec!["u1", "u2", "u3"]), any_role(), any_department(), any_status())
            .prop_map(|(id, role, department, status)| {
                principal(id, role, department).with_status(status)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: identical requests against the same registry always decide the same way.
        #[test]
        fn evaluation_is_deterministic(
            actor in any_principal(),
            target in prop::option::of(any_principal()),
            action in any_action(),
            proposed in prop::option::of(any_status()),
        ) {
            let eval = builtin();
            let first = eval.can_perform_action(&actor, action, target.as_ref(), proposed);
            for _ in 0..3 {
                prop_assert_eq!(
                    eval.can_perform_action(&actor, action, target.as_ref(), proposed),
                    first
                );
            }
        }

        /// Property: a grant always names an applicable rule whose gates all pass.
        #[test]
        fn grants_come_from_applicable_passing_rules(
            actor in any_principal(),
            target in prop::option::of(any_principal()),
            action in any_action(),
            proposed in prop::option::of(any_status()),
        ) {
            let eval = builtin();
            let request = EvaluationRequest {
                actor: &actor,
                action,
                target: target.as_ref(),
                proposed_status: proposed,
            };
            if let Some(index) = eval.matching_rule(&request) {
                let rule = eval.registry().get(index).unwrap();
                prop_assert!(rule.applies_to(actor.role, action));
                prop_assert!(check_gates(rule, &request).is_ok());
                let earlier_rules = eval.applicable_rules(&request).take_while(|(i, _)| *i < index);
                for (earlier, rule) in earlier_rules {
                    prop_assert!(
                        check_gates(rule, &request).is_err(),
                        "rule #{} should have matched first",
                        earlier
                    );
                }
            } else {
                prop_assert!(
                    eval.applicable_rules(&request)
                        .all(|(_, rule)| check_gates(rule, &request).is_err())
                );
            }
        }

        /// Property: mutating a copy of the rules never changes the registry's decisions.
        #[test]
        fn copied_rules_do_not_alias_the_registry(
            actor in any_principal(),
            target in prop::option::of(any_principal()),
            action in any_action(),
        ) {
            let eval = builtin();
            let before = eval.can_perform_action(&actor, action, target.as_ref(), None);

            let mut copy = eval.registry().rules().to_vec();
            copy.clear();
            copy.push(PermissionRule::new([Role::General], Action::ALL.iter().copied()));

            prop_assert_eq!(eval.can_perform_action(&actor, action, target.as_ref(), None), before);
            prop_assert_eq!(eval.registry(), &PolicyRegistry::builtin());
        }
    }
}
