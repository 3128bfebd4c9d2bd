use serde::{Deserialize, Serialize};

use deptguard_core::PrincipalId;

use crate::Role;

/// Organizational unit a principal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    General,
    Hr,
    Sales,
    It,
    Marketing,
    Finance,
}

wire_names!(Department, "department", {
    General => "GENERAL",
    Hr => "HR",
    Sales => "SALES",
    It => "IT",
    Marketing => "MARKETING",
    Finance => "FINANCE",
});

/// Lifecycle state of a principal's account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

wire_names!(Status, "status", {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
});

/// The subject of an authorization decision, either as actor or as target.
///
/// Owned by principal storage; the evaluator only ever borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    pub department: Department,
    #[serde(default)]
    pub status: Status,
}

impl Principal {
    /// An active principal.
    pub fn new(id: PrincipalId, role: Role, department: Department) -> Self {
        Self {
            id,
            role,
            department,
            status: Status::Active,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}
