//! `deptguard-core` — identifiers and the domain error model shared by every crate.
//!
//! No policy logic and no infrastructure concerns live here.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::PrincipalId;
