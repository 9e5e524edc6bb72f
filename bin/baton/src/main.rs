mod pi;
mod relay;
mod settings;

use std::process::ExitCode;

use baton_core::errors::{BatonError, EXIT_BAD_ARGS};
use baton_core::relay::RunReport;

/// `fatal_lines` is one line per fatal condition. Workers that only stopped
/// because a peer failed are left out.
fn fatal_lines(report: &RunReport) -> Vec<String> {
    report
        .errors
        .iter()
        .filter(|err| !matches!(err, BatonError::Aborted { .. }))
        .map(ToString::to_string)
        .collect()
}

/// `conclude` reports the fatal conditions of a run on stderr and turns
/// the run into the process exit status.
pub(crate) fn conclude(report: &RunReport) -> ExitCode {
    for line in fatal_lines(report) {
        eprintln!("{line}");
    }

    if report.cancelled {
        baton_logs::info!("run was cancelled");
    }

    ExitCode::from(report.exit_code())
}

fn main() -> ExitCode {
    let commander = pi::register(relay::register(settings::register(
        clap::Command::new("baton")
            .about("Workers taking strict turns over a ring of mutexes or semaphores")
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(true)
            .arg_required_else_help(true),
    )));

    let matches = match commander.try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(EXIT_BAD_ARGS),
            };
        }
    };

    settings::init_tracing(&matches);

    let outcome = match matches.subcommand() {
        Some(("relay", arguments)) => relay::run(&matches, arguments),
        Some(("pi", arguments)) => pi::run(&matches, arguments),
        _ => Ok(ExitCode::from(EXIT_BAD_ARGS)),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
