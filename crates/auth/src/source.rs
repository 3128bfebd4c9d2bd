//! Policy source format.
//!
//! Policies are written as a JSON array of rule records:
//!
//! ```json
//! [
//!   { "rolesAllowed": ["ADMIN"], "actionsAllowed": ["CREATE", "READ"] },
//!   {
//!     "rolesAllowed": ["GENERAL"],
//!     "actionsAllowed": ["CHANGE_STATUS"],
//!     "targetRolesAllowed": "self",
//!     "allowedStatusChanges": [{ "from": "ACTIVE", "to": "INACTIVE" }]
//!   }
//! ]
//! ```
//!
//! Records keep every enum value as a raw string so that an unknown name is
//! reported with the rule and field it appeared in.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::registry::ConfigError;
use crate::{
    Action, Department, PermissionRule, Role, Status, StatusTransition, TargetDepartments,
    TargetRoles, UnknownVariant,
};

const SELF_KEYWORD: &str = "self";
const SAME_KEYWORD: &str = "same";

/// Where a policy comes from.
#[derive(Debug, Clone)]
pub enum PolicySource<'a> {
    /// Rules assembled in code.
    Rules(Vec<PermissionRule>),
    /// JSON text in the record format above.
    Json(&'a str),
    /// A JSON file on disk.
    File(&'a Path),
    /// The table shipped with the crate (see [`crate::PolicyRegistry::builtin`]).
    Builtin,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RuleRecord {
    #[serde(default)]
    description: Option<String>,
    roles_allowed: Vec<String>,
    actions_allowed: Vec<String>,
    #[serde(default)]
    target_roles_allowed: Option<ScopeRecord>,
    #[serde(default)]
    target_departments_allowed: Option<ScopeRecord>,
    #[serde(default)]
    allowed_status_changes: Option<Vec<TransitionRecord>>,
}

/// Either an explicit list or a keyword sentinel (`"self"` / `"same"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopeRecord {
    Members(Vec<String>),
    Keyword(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransitionRecord {
    from: String,
    to: String,
}

pub(crate) fn parse_records(json: &str) -> Result<Vec<RuleRecord>, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

impl RuleRecord {
    /// Convert into the typed model. Emptiness checks happen in the registry so
    /// that in-code rules get the same validation.
    pub(crate) fn into_rule(self, rule: usize) -> Result<PermissionRule, ConfigError> {
        let roles_allowed = parse_all::<Role>(rule, "rolesAllowed", &self.roles_allowed)?;
        let actions_allowed = parse_all::<Action>(rule, "actionsAllowed", &self.actions_allowed)?;

        let target_roles = match self.target_roles_allowed {
            None => TargetRoles::Any,
            Some(ScopeRecord::Members(names)) => {
                TargetRoles::Only(parse_all(rule, "targetRolesAllowed", &names)?)
            }
            Some(ScopeRecord::Keyword(word)) if word == SELF_KEYWORD => TargetRoles::SelfOnly,
            Some(ScopeRecord::Keyword(word)) => {
                return Err(ConfigError::UnknownKeyword {
                    rule,
                    field: "targetRolesAllowed",
                    value: word,
                    expected: SELF_KEYWORD,
                });
            }
        };

        let target_departments = match self.target_departments_allowed {
            None => TargetDepartments::Any,
            Some(ScopeRecord::Members(names)) => {
                TargetDepartments::Only(parse_all(rule, "targetDepartmentsAllowed", &names)?)
            }
            Some(ScopeRecord::Keyword(word)) if word == SAME_KEYWORD => TargetDepartments::Same,
            Some(ScopeRecord::Keyword(word)) => {
                return Err(ConfigError::UnknownKeyword {
                    rule,
                    field: "targetDepartmentsAllowed",
                    value: word,
                    expected: SAME_KEYWORD,
                });
            }
        };

        let allowed_status_changes = self
            .allowed_status_changes
            .map(|records| {
                records
                    .iter()
                    .map(|t| -> Result<StatusTransition, ConfigError> {
                        Ok(StatusTransition::new(
                            parse_one::<Status>(rule, "allowedStatusChanges", &t.from)?,
                            parse_one::<Status>(rule, "allowedStatusChanges", &t.to)?,
                        ))
                    })
                    .collect::<Result<BTreeSet<_>, ConfigError>>()
            })
            .transpose()?;

        Ok(PermissionRule {
            description: self.description,
            roles_allowed,
            actions_allowed,
            target_roles,
            target_departments,
            allowed_status_changes,
        })
    }
}

fn parse_one<T>(rule: usize, field: &'static str, name: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = UnknownVariant>,
{
    name.parse()
        .map_err(|source| ConfigError::UnknownValue { rule, field, source })
}

fn parse_all<T>(
    rule: usize,
    field: &'static str,
    names: &[String],
) -> Result<BTreeSet<T>, ConfigError>
where
    T: FromStr<Err = UnknownVariant> + Ord,
{
    names.iter().map(|name| parse_one(rule, field, name)).collect()
}
