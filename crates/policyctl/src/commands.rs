//! Subcommands and their exit codes.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use deptguard_auth::{
    LintFinding, PolicyEvaluator, PolicyRegistry, PolicySource, RequestRecord, explain_decision,
    lint,
};

use crate::cli::Command;

/// Exit code of an `explain` whose request is denied.
pub const EXIT_DENIED: u8 = 2;

/// What to print on stdout and how to exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub body: String,
    pub exit_code: u8,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    source: String,
    rules: usize,
    findings: &'a [LintFinding],
}

pub fn run(command: &Command) -> anyhow::Result<Report> {
    match command {
        Command::Check { policy } => {
            let path = policy.as_deref();
            let registry = load_registry(path)?;
            let findings = lint(&registry);

            let report = CheckReport {
                source: describe_source(path),
                rules: registry.len(),
                findings: &findings,
            };
            Ok(Report {
                body: serde_json::to_string_pretty(&report)?,
                exit_code: 0,
            })
        }
        Command::Explain { request, policy } => {
            let path = policy.as_deref();
            let registry = load_registry(path)?;

            let raw = std::fs::read_to_string(request)
                .with_context(|| format!("failed to read request file {}", request.display()))?;
            let record: RequestRecord = serde_json::from_str(&raw)
                .with_context(|| format!("malformed request in {}", request.display()))?;

            let evaluator = PolicyEvaluator::new(registry.into());
            let explanation = explain_decision(&evaluator, &record.as_request());
            tracing::debug!(granted = explanation.granted, "request explained");

            Ok(Report {
                body: serde_json::to_string_pretty(&explanation)?,
                exit_code: if explanation.granted { 0 } else { EXIT_DENIED },
            })
        }
    }
}

fn load_registry(path: Option<&Path>) -> anyhow::Result<PolicyRegistry> {
    let source = match path {
        Some(path) => PolicySource::File(path),
        None => PolicySource::Builtin,
    };
    PolicyRegistry::load(source)
        .with_context(|| format!("policy {} rejected", describe_source(path)))
}

fn describe_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "builtin".to_string(),
    }
}
