use serde::Serialize;
use thiserror::Error;

use deptguard_core::PrincipalId;

use crate::evaluator::{EvaluationRequest, Gate, PolicyEvaluator, check_gates};
use crate::{Action, PermissionRule, Principal, Status, TargetDepartments, TargetRoles};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: principal '{actor}' may not {action}")]
    Forbidden { actor: PrincipalId, action: Action },
}

/// Authorize a request at a service boundary.
///
/// The evaluator itself only answers yes/no; this turns "no" into a distinct
/// error kind callers can map to a client-facing status.
///
/// - No IO
/// - No panics
pub fn authorize(
    evaluator: &PolicyEvaluator,
    request: &EvaluationRequest<'_>,
) -> Result<(), AuthzError> {
    if evaluator.evaluate(request) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            actor: request.actor.id.clone(),
            action: request.action,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of a policy decision.
///
/// Always agrees with [`PolicyEvaluator::evaluate`] for the same request.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionExplanation {
    pub action: Action,

    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    pub actor: Principal,

    pub target: Option<Principal>,

    pub proposed_status: Option<Status>,

    /// Registry index of the granting rule.
    pub matched_rule: Option<usize>,

    /// Applicable rules visited before the scan stopped, in order.
    pub evaluated_rules: Vec<RuleOutcome>,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

/// How one applicable rule fared.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule: usize,
    pub description: Option<String>,
    /// First gate that rejected the request; `None` means the rule granted.
    pub failed_gate: Option<Gate>,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// No rule grants this action to the actor's role at all.
    NoApplicableRule,
    /// Rules exist for the role/action, but each failed one of its gates.
    GatesFailed,
}

/// Explain why a request would be granted or denied.
pub fn explain_decision(
    evaluator: &PolicyEvaluator,
    request: &EvaluationRequest<'_>,
) -> DecisionExplanation {
    let mut evaluated_rules = Vec::new();
    let mut matched_rule = None;

    for (index, rule) in evaluator.applicable_rules(request) {
        let gate = check_gates(rule, request).err();
        evaluated_rules.push(RuleOutcome {
            rule: index,
            description: rule.description.clone(),
            failed_gate: gate,
            detail: match gate {
                Some(gate) => describe_gate_failure(rule, gate, request),
                None => "all gates passed".to_string(),
            },
        });
        if gate.is_none() {
            matched_rule = Some(index);
            break;
        }
    }

    let granted = matched_rule.is_some();
    let role = request.actor.role;
    let action = request.action;

    let (reason, denial_reason) = match matched_rule {
        Some(index) => {
            let label = evaluator
                .registry()
                .get(index)
                .map(|rule| rule.label(index))
                .unwrap_or_else(|| format!("rule #{index}"));
            (format!("granted by {label}"), None)
        }
        None if evaluated_rules.is_empty() => (
            format!("no rule grants {action} to role {role}"),
            Some(DenialReason {
                kind: DenialKind::NoApplicableRule,
                message: format!("role {role} has no grant for action {action}"),
                suggestions: vec![
                    format!(
                        "Add a rule listing {role} in rolesAllowed and {action} in actionsAllowed"
                    ),
                    "Act through a principal whose role is granted this action".to_string(),
                ],
            }),
        ),
        None => {
            let suggestions = evaluated_rules
                .iter()
                .map(|outcome| format!("rule #{}: {}", outcome.rule, outcome.detail))
                .collect();
            (
                format!(
                    "{} applicable rule(s) for {role}/{action}, none passed its gates",
                    evaluated_rules.len()
                ),
                Some(DenialReason {
                    kind: DenialKind::GatesFailed,
                    message: "every applicable rule rejected the target or transition".to_string(),
                    suggestions,
                }),
            )
        }
    };

    DecisionExplanation {
        action,
        granted,
        reason,
        actor: request.actor.clone(),
        target: request.target.cloned(),
        proposed_status: request.proposed_status,
        matched_rule,
        evaluated_rules,
        denial_reason,
    }
}

fn describe_gate_failure(
    rule: &PermissionRule,
    gate: Gate,
    request: &EvaluationRequest<'_>,
) -> String {
    let Some(target) = request.target else {
        return format!("{gate} gate requires a target principal");
    };

    match gate {
        Gate::TargetRole => match &rule.target_roles {
            TargetRoles::SelfOnly => format!(
                "only the actor's own account may be targeted (target '{}' is not '{}')",
                target.id, request.actor.id
            ),
            TargetRoles::Only(roles) => format!(
                "target role {} is not one of {}",
                target.role,
                join(roles.iter())
            ),
            TargetRoles::Any => "target role unconstrained".to_string(),
        },
        Gate::TargetDepartment => match &rule.target_departments {
            TargetDepartments::Same => format!(
                "target department {} differs from actor department {}",
                target.department, request.actor.department
            ),
            TargetDepartments::Only(departments) => format!(
                "target department {} is not one of {}",
                target.department,
                join(departments.iter())
            ),
            TargetDepartments::Any => "target department unconstrained".to_string(),
        },
        Gate::StatusTransition => match request.proposed_status {
            None => "status change requires a proposed status".to_string(),
            Some(to) => format!(
                "transition {} -> {to} is not allowed (allowed: {})",
                target.status,
                rule.allowed_status_changes
                    .as_ref()
                    .map(|set| join(set.iter()))
                    .unwrap_or_default()
            ),
        },
    }
}

fn join<T: core::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    let parts: Vec<String> = items.map(|item| item.to_string()).collect();
    if parts.is_empty() {
        "[]".to_string()
    } else {
        format!("[{}]", parts.join(", "))
    }
}
