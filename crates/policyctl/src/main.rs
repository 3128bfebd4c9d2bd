use std::process::ExitCode;

use clap::Parser;

use deptguard_policyctl::{Cli, run};

fn main() -> ExitCode {
    // Usage errors exit 1: clap's default of 2 is the "denied" code here.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };
    deptguard_observability::init(cli.log_format);

    match run(&cli.command) {
        Ok(report) => {
            println!("{}", report.body);
            ExitCode::from(report.exit_code)
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "policyctl failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
