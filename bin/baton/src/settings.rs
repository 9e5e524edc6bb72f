use std::path::PathBuf;
use std::time::Duration;

use baton_config::ConfigError;
use baton_core::errors::{ArgumentError, BatonError, EXIT_BAD_ARGS};
use derive_more::derive::From;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// `DEFAULT_UNIT_LEN` is how many series terms a pi worker sums between
/// cancellation checks.
pub const DEFAULT_UNIT_LEN: u64 = 100_000;

#[derive(Debug, From)]
pub enum CliError {
    Config(ConfigError),
    Argument(ArgumentError),
    Baton(BatonError),
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Argument(err) => Some(err),
            Self::Baton(err) => Some(err),
        }
    }
}

impl core::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Argument(err) => write!(f, "{err}"),
            Self::Baton(err) => write!(f, "{err}"),
        }
    }
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Argument(_) => EXIT_BAD_ARGS,
            Self::Baton(err) => err.exit_code(),
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySettings {
    pub ring: Option<String>,
    pub payloads: Option<Vec<String>>,

    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "poll_interval_ms")]
    pub poll_interval: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PiSettings {
    pub unit_len: Option<u64>,
}

/// `Settings` mirrors the optional `--config` TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub relay: RelaySettings,
    pub pi: PiSettings,
}

impl Settings {
    /// `load` reads the file named by `--config`, or returns the defaults.
    pub fn load(global: &clap::ArgMatches) -> Result<Self, CliError> {
        match global.get_one::<PathBuf>("config") {
            Some(path) => {
                let settings: Settings = baton_config::from_path(path.clone())?;
                tracing::debug!("loaded settings from {}", path.display());
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }
}

pub fn register(command: clap::Command) -> clap::Command {
    command
        .arg(
            clap::Arg::new("config")
                .long("config")
                .global(true)
                .action(clap::ArgAction::Set)
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML file with [relay] and [pi] defaults"),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::Count)
                .help("Log to stderr, repeat for more detail"),
        )
}

fn level_for(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// `init_tracing` sends logs to stderr so stdout only carries relay output.
/// Without `-v` nothing is installed and stderr only gets fatal conditions.
pub fn init_tracing(global: &clap::ArgMatches) {
    let Some(level) = level_for(global.get_count("verbose")) else {
        return;
    };

    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }
}
