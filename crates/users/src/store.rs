//! Principal storage abstraction.

use std::collections::BTreeMap;
use std::sync::RwLock;

use deptguard_core::PrincipalId;

use crate::record::UserRecord;

/// Lookup and persistence of user records.
///
/// Lookups return `Ok(None)` for unknown keys; `Err` is reserved for
/// uniqueness violations and storage failures.
pub trait PrincipalStore: Send + Sync {
    fn get_by_id(&self, id: &PrincipalId) -> Result<Option<UserRecord>, StoreError>;

    /// `email` is expected in normalized (lowercase) form.
    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// All records, ordered by id.
    fn list(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Insert a new record; id and email must both be unused.
    fn insert(&self, record: UserRecord) -> Result<(), StoreError>;

    /// Replace an existing record; the email must not belong to another record.
    fn update(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// Remove a record, returning it.
    fn delete(&self, id: &PrincipalId) -> Result<UserRecord, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("user not found: {0}")]
    NotFound(PrincipalId),
    #[error("user already exists with id {0}")]
    DuplicateId(PrincipalId),
    #[error("user already exists with email {0}")]
    DuplicateEmail(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory principal store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    users: RwLock<BTreeMap<PrincipalId, UserRecord>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records without authorization checks (fixtures, bootstrap admin).
    ///
    /// Emails are stored lowercased and uniqueness is enforced as for `insert`.
    pub fn with_records(
        records: impl IntoIterator<Item = UserRecord>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for mut record in records {
            record.email = record.email.trim().to_lowercase();
            store.insert(record)?;
        }
        Ok(store)
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Storage("user table lock poisoned".to_string())
}

impl PrincipalStore for InMemoryPrincipalStore {
    fn get_by_id(&self, id: &PrincipalId) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(id).cloned())
    }

    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().cloned().collect())
    }

    fn insert(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        if users.values().any(|u| u.email == record.email) {
            return Err(StoreError::DuplicateEmail(record.email));
        }
        users.insert(record.id.clone(), record);
        Ok(())
    }

    fn update(&self, record: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if !users.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id.clone()));
        }
        if users
            .values()
            .any(|u| u.id != record.id && u.email == record.email)
        {
            return Err(StoreError::DuplicateEmail(record.email.clone()));
        }
        users.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, id: &PrincipalId) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        users.remove(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
