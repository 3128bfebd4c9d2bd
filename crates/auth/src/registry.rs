//! The ordered, immutable rule table.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::source::{PolicySource, parse_records};
use crate::{Action, PermissionRule, Role, Status, StatusTransition, UnknownVariant, lint};

/// A policy source that cannot be loaded.
///
/// Always fatal: a process must not start with a partially valid rule table.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read policy file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy source: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rule #{rule}: rolesAllowed must not be empty")]
    EmptyRoles { rule: usize },

    #[error("rule #{rule}: actionsAllowed must not be empty")]
    EmptyActions { rule: usize },

    #[error("rule #{rule}: {field}: {source}")]
    UnknownValue {
        rule: usize,
        field: &'static str,
        #[source]
        source: UnknownVariant,
    },

    #[error("rule #{rule}: {field}: unknown keyword '{value}' (expected '{expected}' or a list)")]
    UnknownKeyword {
        rule: usize,
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Ordered collection of [`PermissionRule`]s, fixed after load.
///
/// Declaration order is evaluation order. There is no way to mutate a registry
/// once built; runtime reloads replace the whole instance (see
/// [`crate::SharedPolicy`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRegistry {
    rules: Vec<PermissionRule>,
}

impl PolicyRegistry {
    pub fn load(source: PolicySource<'_>) -> Result<Self, ConfigError> {
        match source {
            PolicySource::Rules(rules) => Self::from_rules(rules),
            PolicySource::Json(json) => Self::from_json_str(json),
            PolicySource::File(path) => Self::from_path(path),
            PolicySource::Builtin => Ok(Self::builtin()),
        }
    }

    /// Validate rules assembled in code.
    pub fn from_rules(rules: Vec<PermissionRule>) -> Result<Self, ConfigError> {
        for (index, rule) in rules.iter().enumerate() {
            validate(index, rule)?;
        }
        Ok(Self::published(rules))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let rules = parse_records(json)?
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_rule(index))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rules(rules)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "reading policy file");
        Self::from_json_str(&json)
    }

    /// The stock user-management policy (also shipped as `policy/default.json`).
    ///
    /// - admins: every action on anyone;
    /// - department heads: every action on general staff of their own
    ///   department, reactivation only;
    /// - general staff: read/update/deactivate their own account.
    pub fn builtin() -> Self {
        let all_actions = Action::ALL.iter().copied();
        Self::published(vec![
            PermissionRule::new([Role::Admin], all_actions.clone())
                .described("admins manage every account"),
            PermissionRule::new([Role::DepartmentHead], all_actions)
                .described("department heads manage general staff in their department")
                .targeting_roles([Role::General])
                .targeting_same_department()
                .allowing_status_changes([StatusTransition::new(
                    Status::Inactive,
                    Status::Active,
                )]),
            PermissionRule::new(
                [Role::General],
                [Action::Read, Action::Update, Action::ChangeStatus],
            )
            .described("general staff manage their own account")
            .targeting_self()
            .allowing_status_changes([StatusTransition::new(
                Status::Active,
                Status::Inactive,
            )]),
        ])
    }

    /// Wrap validated rules, logging the load and every lint finding.
    fn published(rules: Vec<PermissionRule>) -> Self {
        let registry = Self { rules };
        tracing::info!(rules = registry.len(), "policy loaded");
        for finding in lint::lint(&registry) {
            tracing::warn!(rule = finding.rule, "policy lint: {finding}");
        }
        registry
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&PermissionRule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn validate(index: usize, rule: &PermissionRule) -> Result<(), ConfigError> {
    if rule.roles_allowed.is_empty() {
        return Err(ConfigError::EmptyRoles { rule: index });
    }
    if rule.actions_allowed.is_empty() {
        return Err(ConfigError::EmptyActions { rule: index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::{TargetDepartments, TargetRoles};

    const SHIPPED_POLICY: &str = include_str!("../policy/default.json");

    #[test]
    fn builtin_table_passes_validation() {
        let builtin = PolicyRegistry::builtin();
        let validated = PolicyRegistry::from_rules(builtin.rules().to_vec()).unwrap();
        assert_eq!(validated, builtin);
        assert_eq!(builtin.len(), 3);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn builtin_table_logs_its_load() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        let registry = tracing::subscriber::with_default(subscriber, PolicyRegistry::builtin);

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("policy loaded"), "got {output:?}");
        assert!(output.contains(&format!("rules={}", registry.len())), "got {output:?}");
    }

    #[test]
    fn shipped_policy_file_matches_builtin_table() {
        let loaded = PolicyRegistry::from_json_str(SHIPPED_POLICY).unwrap();
        assert_eq!(loaded, PolicyRegistry::builtin());
    }

    #[test]
    fn rules_keep_declaration_order() {
        let registry = PolicyRegistry::from_json_str(
            r#"[
                {
                    "rolesAllowed": ["GENERAL"], "actionsAllowed": ["READ"],
                    "targetRolesAllowed": "self"
                },
                { "rolesAllowed": ["ADMIN"], "actionsAllowed": ["DELETE"] },
                {
                    "rolesAllowed": ["DEPARTMENT_HEAD"], "actionsAllowed": ["UPDATE"],
                    "targetDepartmentsAllowed": "same"
                }
            ]"#,
        )
        .unwrap();

        let targets: Vec<_> = registry
            .rules()
            .iter()
            .map(|r| (r.target_roles.clone(), r.target_departments.clone()))
            .collect();
        assert_eq!(
            targets,
            vec![
                (TargetRoles::SelfOnly, TargetDepartments::Any),
                (TargetRoles::Any, TargetDepartments::Any),
                (TargetRoles::Any, TargetDepartments::Same),
            ]
        );

        // Iteration is repeatable.
        assert_eq!(registry.rules(), registry.rules());
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn empty_roles_are_rejected_with_rule_index() {
        let err = PolicyRegistry::from_json_str(
            r#"[
                { "rolesAllowed": ["ADMIN"], "actionsAllowed": ["READ"] },
                { "rolesAllowed": [], "actionsAllowed": ["READ"] }
            ]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRoles { rule: 1 }), "got {err:?}");
    }

    #[test]
    fn empty_actions_are_rejected_for_in_code_rules() {
        let rules = vec![PermissionRule::new([Role::Admin], std::iter::empty())];
        let err = PolicyRegistry::load(PolicySource::Rules(rules)).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyActions { rule: 0 }));
    }

    #[test]
    fn unknown_role_is_a_config_error() {
        let err = PolicyRegistry::from_json_str(
            r#"[{ "rolesAllowed": ["ROOT"], "actionsAllowed": ["READ"] }]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ROOT"), "got {err}");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PolicyRegistry::load(PolicySource::File(Path::new("/nonexistent/policy.json")))
            .unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("policy.json")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn empty_policy_is_allowed() {
        let registry = PolicyRegistry::from_json_str("[]").unwrap();
        assert!(registry.is_empty());
    }
}
