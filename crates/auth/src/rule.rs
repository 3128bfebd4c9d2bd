//! Declarative permission rules.
//!
//! A [`PermissionRule`] is plain data: who may act (`roles_allowed`), what they
//! may do (`actions_allowed`), and up to three gates restricting the target of
//! the action. Gate logic lives next to the gate types so each one can be read
//! (and matched exhaustively) in isolation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Action, Department, Principal, Role, Status};

/// A permitted `(current status → proposed status)` pair for `ChangeStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: Status,
    pub to: Status,
}

impl StatusTransition {
    pub fn new(from: Status, to: Status) -> Self {
        Self { from, to }
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

impl core::fmt::Display for StatusTransition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Which targets a rule accepts, by role.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetRoles {
    /// Field omitted: any target, or none at all.
    #[default]
    Any,
    /// The target must be supplied and hold one of these roles.
    Only(BTreeSet<Role>),
    /// The target must be supplied and be the actor itself.
    SelfOnly,
}

impl TargetRoles {
    pub fn admits(&self, actor: &Principal, target: Option<&Principal>) -> bool {
        match self {
            TargetRoles::Any => true,
            TargetRoles::Only(roles) => target.is_some_and(|t| roles.contains(&t.role)),
            TargetRoles::SelfOnly => target.is_some_and(|t| t.id == actor.id),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TargetRoles::Any)
    }
}

/// Which targets a rule accepts, by department.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetDepartments {
    /// Field omitted: any target, or none at all.
    #[default]
    Any,
    /// The target must be supplied and belong to one of these departments.
    Only(BTreeSet<Department>),
    /// The target must be supplied and share the actor's department.
    Same,
}

impl TargetDepartments {
    pub fn admits(&self, actor: &Principal, target: Option<&Principal>) -> bool {
        match self {
            TargetDepartments::Any => true,
            TargetDepartments::Only(departments) => {
                target.is_some_and(|t| departments.contains(&t.department))
            }
            TargetDepartments::Same => target.is_some_and(|t| t.department == actor.department),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TargetDepartments::Any)
    }
}

/// A single policy clause.
///
/// Rules are assembled into a [`crate::PolicyRegistry`], which validates that
/// `roles_allowed` and `actions_allowed` are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRule {
    /// Free-form note for humans (shown by explanations and lints).
    pub description: Option<String>,
    pub roles_allowed: BTreeSet<Role>,
    pub actions_allowed: BTreeSet<Action>,
    pub target_roles: TargetRoles,
    pub target_departments: TargetDepartments,
    /// Only consulted for [`Action::ChangeStatus`]. `None` leaves transitions unconstrained.
    pub allowed_status_changes: Option<BTreeSet<StatusTransition>>,
}

impl PermissionRule {
    /// An unconstrained grant of `actions` to `roles`.
    pub fn new(
        roles: impl IntoIterator<Item = Role>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        Self {
            description: None,
            roles_allowed: roles.into_iter().collect(),
            actions_allowed: actions.into_iter().collect(),
            target_roles: TargetRoles::Any,
            target_departments: TargetDepartments::Any,
            allowed_status_changes: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn targeting_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.target_roles = TargetRoles::Only(roles.into_iter().collect());
        self
    }

    pub fn targeting_self(mut self) -> Self {
        self.target_roles = TargetRoles::SelfOnly;
        self
    }

    pub fn targeting_departments(
        mut self,
        departments: impl IntoIterator<Item = Department>,
    ) -> Self {
        self.target_departments = TargetDepartments::Only(departments.into_iter().collect());
        self
    }

    pub fn targeting_same_department(mut self) -> Self {
        self.target_departments = TargetDepartments::Same;
        self
    }

    pub fn allowing_status_changes(
        mut self,
        transitions: impl IntoIterator<Item = StatusTransition>,
    ) -> Self {
        self.allowed_status_changes = Some(transitions.into_iter().collect());
        self
    }

    /// Role + action predicate: whether the rule belongs to the applicable set.
    pub fn applies_to(&self, role: Role, action: Action) -> bool {
        self.roles_allowed.contains(&role) && self.actions_allowed.contains(&action)
    }

    /// Whether `action` is granted by this rule regardless of target or transition.
    pub fn is_unconstrained_for(&self, action: Action) -> bool {
        self.target_roles.is_any()
            && self.target_departments.is_any()
            && (action != Action::ChangeStatus || self.allowed_status_changes.is_none())
    }

    /// Status-transition gate.
    ///
    /// Passes for every action other than `ChangeStatus`, and for rules that do
    /// not list transitions. Otherwise both a target and a proposed status are
    /// required and the pair must be listed.
    pub fn admits_transition(
        &self,
        action: Action,
        target: Option<&Principal>,
        proposed: Option<Status>,
    ) -> bool {
        if action != Action::ChangeStatus {
            return true;
        }
        let Some(allowed) = &self.allowed_status_changes else {
            return true;
        };
        match (target, proposed) {
            (Some(target), Some(to)) => allowed.contains(&StatusTransition::new(target.status, to)),
            _ => false,
        }
    }

    pub fn label(&self, index: usize) -> String {
        match &self.description {
            Some(text) => format!("rule #{index} ({text})"),
            None => format!("rule #{index}"),
        }
    }
}
