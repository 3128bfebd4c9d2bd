//! `deptguard-auth` — declarative authorization policy for user management.
//!
//! Pure decision logic: no HTTP, no storage, no credentials. Callers hand in
//! already-authenticated [`Principal`]s and get a yes/no back.
//!
//! ```text
//! PolicySource ──load──▶ PolicyRegistry (ordered, immutable rules)
//!                               │ Arc
//!                               ▼
//! EvaluationRequest ──▶ PolicyEvaluator ──▶ Decision (bool)
//!                               │
//!                 authorize() / explain_decision() / lint()
//! ```

#[macro_use]
mod names;

pub mod action;
pub mod authorize;
pub mod evaluator;
pub mod lint;
pub mod principal;
pub mod registry;
pub mod roles;
pub mod rule;
pub mod shared;
pub mod source;

pub use action::Action;
pub use authorize::{AuthzError, DecisionExplanation, DenialKind, authorize, explain_decision};
pub use evaluator::{Decision, EvaluationRequest, Gate, PolicyEvaluator, RequestRecord, check_gates};
pub use lint::{LintFinding, LintKind, lint};
pub use names::UnknownVariant;
pub use principal::{Department, Principal, Status};
pub use registry::{ConfigError, PolicyRegistry};
pub use roles::Role;
pub use rule::{PermissionRule, StatusTransition, TargetDepartments, TargetRoles};
pub use shared::SharedPolicy;
pub use source::PolicySource;
