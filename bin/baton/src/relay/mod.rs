use std::process::ExitCode;

use baton_core::errors::ArgumentError;
use baton_core::relay::{parse_positive, Budget, Coordinator, Pacing, RelayConfig};
use baton_core::ring::RingKind;

use crate::settings::{CliError, Settings};

/// `DEFAULT_ITERATIONS` is how many lines each worker prints when the
/// count is left out.
pub const DEFAULT_ITERATIONS: &str = "10";

pub fn register(command: clap::Command) -> clap::Command {
    command.subcommand(
        clap::Command::new("relay")
            .about("workers take strict turns printing `<worker> <visit> <payload>` lines")
            .arg(
                clap::Arg::new("workers")
                    .required(true)
                    .allow_negative_numbers(true)
                    .value_parser(clap::value_parser!(String))
                    .help("How many workers take part, a positive integer"),
            )
            .arg(
                clap::Arg::new("iterations")
                    .allow_negative_numbers(true)
                    .value_parser(clap::value_parser!(String))
                    .default_value(DEFAULT_ITERATIONS)
                    .help("How many lines each worker prints, a positive integer"),
            )
            .arg(
                clap::Arg::new("ring")
                    .long("ring")
                    .action(clap::ArgAction::Set)
                    .value_parser(clap::value_parser!(String))
                    .help("The slot primitive: mutex or semaphore"),
            )
            .arg(
                clap::Arg::new("payload")
                    .long("payload")
                    .action(clap::ArgAction::Append)
                    .value_parser(clap::value_parser!(String))
                    .help("Text printed by the workers, assigned round-robin; repeatable"),
            ),
    )
}

fn positional<'a>(
    args: &'a clap::ArgMatches,
    name: &'static str,
) -> Result<&'a str, ArgumentError> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or(ArgumentError::Missing(name))
}

pub fn run(global: &clap::ArgMatches, args: &clap::ArgMatches) -> Result<ExitCode, CliError> {
    let settings = Settings::load(global)?.relay;

    let workers = parse_positive::<usize>("workers", positional(args, "workers")?)?;
    let iterations = parse_positive::<u64>("iterations", positional(args, "iterations")?)?;

    let ring: RingKind = args
        .get_one::<String>("ring")
        .or(settings.ring.as_ref())
        .map_or(Ok(RingKind::Mutex), |ring| ring.parse())?;

    let payloads: Vec<String> = match args.get_many::<String>("payload") {
        Some(values) => values.cloned().collect(),
        None => settings.payloads.unwrap_or_default(),
    };

    let mut config = RelayConfig::new(workers, Budget::Units(iterations))
        .with_pacing(Pacing::Ring(ring));
    if !payloads.is_empty() {
        config = config.with_payloads(payloads);
    }
    if let Some(poll_interval) = settings.poll_interval {
        config = config.with_poll_interval(poll_interval);
    }

    baton_logs::info!(
        "relay of {} workers over a {} ring, {} visits each",
        workers,
        ring,
        iterations
    );

    let report = Coordinator::new(config).run()?;
    Ok(crate::conclude(&report))
}
