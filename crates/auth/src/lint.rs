//! Authoring checks for rule tables.
//!
//! First-match evaluation makes declaration order a priority scheme, which is
//! easy to get wrong. These checks flag rules that can never grant, or whose
//! constraints are silently ignored. Findings are warnings: a table with
//! findings still loads.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{Action, PolicyRegistry, StatusTransition, TargetDepartments, TargetRoles};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LintKind {
    /// Every role/action pair of the rule is already granted unconditionally
    /// by the listed earlier rules.
    Shadowed { by: Vec<usize> },
    /// `allowedStatusChanges` is set but the rule does not grant `CHANGE_STATUS`.
    StatusChangesIgnored,
    /// An explicit, empty `targetRolesAllowed` list rejects every target.
    NoTargetRoles,
    /// An explicit, empty `targetDepartmentsAllowed` list rejects every target.
    NoTargetDepartments,
    /// An explicit, empty `allowedStatusChanges` list rejects every transition.
    NoStatusChanges,
    /// A transition whose source and destination are the same status.
    NoopTransition { transition: StatusTransition },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    pub rule: usize,
    #[serde(flatten)]
    pub kind: LintKind,
}

impl core::fmt::Display for LintFinding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "rule #{}: ", self.rule)?;
        match &self.kind {
            LintKind::Shadowed { by } => {
                write!(
                    f,
                    "unreachable, every grant is already made unconditionally by rule(s) {by:?}"
                )
            }
            LintKind::StatusChangesIgnored => {
                f.write_str("allowedStatusChanges has no effect without CHANGE_STATUS")
            }
            LintKind::NoTargetRoles => f.write_str("empty targetRolesAllowed matches no target"),
            LintKind::NoTargetDepartments => {
                f.write_str("empty targetDepartmentsAllowed matches no target")
            }
            LintKind::NoStatusChanges => {
                f.write_str("empty allowedStatusChanges permits no status change")
            }
            LintKind::NoopTransition { transition } => {
                write!(f, "transition {transition} does not change anything")
            }
        }
    }
}

pub fn lint(registry: &PolicyRegistry) -> Vec<LintFinding> {
    let rules = registry.rules();
    let mut findings = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        let mut shadowed_by = BTreeSet::new();
        let fully_shadowed = rule.roles_allowed.iter().all(|&role| {
            rule.actions_allowed.iter().all(|&action| {
                let cover = rules[..index].iter().position(|earlier| {
                    earlier.applies_to(role, action) && earlier.is_unconstrained_for(action)
                });
                if let Some(earlier) = cover {
                    shadowed_by.insert(earlier);
                }
                cover.is_some()
            })
        });
        if fully_shadowed && !rule.roles_allowed.is_empty() && !rule.actions_allowed.is_empty() {
            findings.push(LintFinding {
                rule: index,
                kind: LintKind::Shadowed {
                    by: shadowed_by.into_iter().collect(),
                },
            });
        }

        if matches!(&rule.target_roles, TargetRoles::Only(roles) if roles.is_empty()) {
            findings.push(LintFinding { rule: index, kind: LintKind::NoTargetRoles });
        }
        if matches!(&rule.target_departments, TargetDepartments::Only(d) if d.is_empty()) {
            findings.push(LintFinding { rule: index, kind: LintKind::NoTargetDepartments });
        }

        if let Some(transitions) = &rule.allowed_status_changes {
            if !rule.actions_allowed.contains(&Action::ChangeStatus) {
                findings.push(LintFinding { rule: index, kind: LintKind::StatusChangesIgnored });
            } else if transitions.is_empty() {
                findings.push(LintFinding { rule: index, kind: LintKind::NoStatusChanges });
            }
            for transition in transitions.iter().filter(|t| t.is_noop()) {
                findings.push(LintFinding {
                    rule: index,
                    kind: LintKind::NoopTransition { transition: *transition },
                });
            }
        }
    }

    findings
}
