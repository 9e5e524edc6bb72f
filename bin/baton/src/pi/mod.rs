use std::process::ExitCode;
use std::sync::Arc;

use baton_core::errors::ArgumentError;
use baton_core::kernels::Leibniz;
use baton_core::relay::{
    install_interrupt_handler, parse_positive, Budget, CancellationSignal, Coordinator, Pacing,
    RelayConfig, UNTIL_CANCELLED,
};

use crate::settings::{CliError, Settings, DEFAULT_UNIT_LEN};

pub fn register(command: clap::Command) -> clap::Command {
    command.subcommand(
        clap::Command::new("pi")
            .about("estimates pi from the Leibniz series split across workers; Ctrl-C stops early")
            .arg(
                clap::Arg::new("workers")
                    .required(true)
                    .allow_negative_numbers(true)
                    .value_parser(clap::value_parser!(String))
                    .help("How many workers share the series, a positive integer"),
            )
            .arg(
                clap::Arg::new("budget")
                    .allow_negative_numbers(true)
                    .value_parser(clap::value_parser!(String))
                    .default_value(UNTIL_CANCELLED)
                    .help("Units per worker, or until-cancelled to run until Ctrl-C"),
            )
            .arg(
                clap::Arg::new("unit_len")
                    .long("unit-len")
                    .action(clap::ArgAction::Set)
                    .allow_negative_numbers(true)
                    .value_parser(clap::value_parser!(String))
                    .help("Series terms summed per unit, between cancellation checks"),
            ),
    )
}

pub fn run(global: &clap::ArgMatches, args: &clap::ArgMatches) -> Result<ExitCode, CliError> {
    let settings = Settings::load(global)?.pi;

    let workers = args
        .get_one::<String>("workers")
        .ok_or(ArgumentError::Missing("workers"))?;
    let workers = parse_positive::<usize>("workers", workers)?;

    let budget: Budget = args
        .get_one::<String>("budget")
        .map_or(Ok(Budget::UntilCancelled), |budget| budget.parse())?;

    let unit_len = match args.get_one::<String>("unit_len") {
        Some(value) => parse_positive::<u64>("unit length", value)?,
        None => settings.unit_len.unwrap_or(DEFAULT_UNIT_LEN),
    };

    let cancel = CancellationSignal::new();
    if let Err(err) = install_interrupt_handler(&cancel) {
        baton_logs::warn!("Ctrl-C will not cancel the run: {}", err);
    }

    let config = RelayConfig::new(workers, budget)
        .with_pacing(Pacing::Free)
        .with_unit_len(unit_len);

    baton_logs::info!(
        "summing the Leibniz series over {} workers, budget {}, {} terms per unit",
        workers,
        budget,
        unit_len
    );

    let report = Coordinator::new(config)
        .with_kernel(Arc::new(Leibniz))
        .with_cancellation(cancel)
        .run()?;

    if let Some(pi) = report.aggregate.value() {
        println!("pi = {pi:.15}");
    }
    Ok(crate::conclude(&report))
}
