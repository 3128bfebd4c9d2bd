//! Command-line surface.
//!
//! # Environment Variables
//!
//! - `DEPTGUARD_POLICY_PATH`: policy file used when a command names none
//! - `DEPTGUARD_LOG_FORMAT`: `json` (default) or `pretty`

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use deptguard_observability::LogFormat;

/// Validate, lint and query deptguard policy files
#[derive(Parser, Debug)]
#[command(name = "deptguard-policyctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format (json or pretty)
    #[arg(long, global = true, env = "DEPTGUARD_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a policy and report its lint findings
    Check {
        /// Policy file (built-in policy when absent)
        #[arg(env = "DEPTGUARD_POLICY_PATH")]
        policy: Option<PathBuf>,
    },

    /// Explain how the policy decides a request
    Explain {
        /// JSON file holding the request (actor, action, target, proposedStatus)
        request: PathBuf,

        /// Policy file (built-in policy when absent)
        #[arg(env = "DEPTGUARD_POLICY_PATH")]
        policy: Option<PathBuf>,
    },
}
