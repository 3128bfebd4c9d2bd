use serde::{Deserialize, Serialize};

/// Class of authority held by a principal.
///
/// Roles carry no implicit rank: what a role may do is decided solely by the
/// rules that list it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    General,
    DepartmentHead,
    Admin,
}

wire_names!(Role, "role", {
    General => "GENERAL",
    DepartmentHead => "DEPARTMENT_HEAD",
    Admin => "ADMIN",
});
