//! `deptguard-users` — user management on top of the policy evaluator.
//!
//! Every operation resolves its target through a [`PrincipalStore`], asks the
//! policy, and only then touches storage. Storage itself is abstract; the
//! in-memory store is for tests and local tooling.

pub mod error;
pub mod record;
pub mod service;
pub mod store;

pub use error::UserServiceError;
pub use record::{NewUser, UserRecord, UserUpdate};
pub use service::UserService;
pub use store::{InMemoryPrincipalStore, PrincipalStore, StoreError};
