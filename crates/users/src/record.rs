//! User records as held by principal storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deptguard_auth::{Department, Principal, Role, Status};
use deptguard_core::{DomainError, DomainResult, PrincipalId};

const MAX_NAME_LEN: usize = 100;

/// A stored user account. Credentials live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: PrincipalId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Department,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// The authorization view of this account.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id.clone(), self.role, self.department).with_status(self.status)
    }
}

/// Input for registering an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Issued by the service when absent.
    #[serde(default)]
    pub id: Option<PrincipalId>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Department,
    #[serde(default)]
    pub status: Status,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        department: Department,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            role,
            department,
            status: Status::Active,
        }
    }

    pub fn with_id(mut self, id: PrincipalId) -> Self {
        self.id = Some(id);
        self
    }

    /// Validate and turn into a record stamped with `now`.
    pub fn into_record(self, now: DateTime<Utc>) -> DomainResult<UserRecord> {
        Ok(UserRecord {
            id: self.id.unwrap_or_default(),
            name: validate_name(&self.name)?,
            email: normalize_email(&self.email)?,
            role: self.role,
            department: self.department,
            status: self.status,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of profile fields. Status changes go through
/// `UserService::change_user_status` so they are checked as transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub department: Option<Department>,
}

impl UserUpdate {
    pub fn apply(&self, current: &UserRecord, now: DateTime<Utc>) -> DomainResult<UserRecord> {
        let mut updated = current.clone();
        if let Some(name) = &self.name {
            updated.name = validate_name(name)?;
        }
        if let Some(email) = &self.email {
            updated.email = normalize_email(email)?;
        }
        if let Some(role) = self.role {
            updated.role = role;
        }
        if let Some(department) = self.department {
            updated.department = department;
        }
        updated.updated_at = now;
        Ok(updated)
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Emails are compared case-insensitively, so they are stored lowercased.
pub(crate) fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation(format!("invalid email format: '{email}'")));
    }
    Ok(email)
}
