//! `deptguard-policyctl` — validate, lint and query policy files offline.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::{EXIT_DENIED, Report, run};
