//! dvbio: tune a Linux DVB-T adapter and read its transport stream.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{debug, error};

mod commands;
mod context;
mod settings;

use commands::CommandResult;
use context::{Cli, Commands};
use settings::Settings;

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run(cli: Cli) -> CommandResult {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!("{:?}", settings);

    match cli.command {
        Commands::List { format } => commands::list::run(&settings.dvb, format),
        Commands::Checksignal {
            frequency,
            adapter,
            interval_ms,
            count,
        } => {
            let frequency = settings.frequency(frequency)?;
            let adapter = settings.adapter(adapter);
            commands::signal::run(
                &settings,
                frequency,
                adapter.as_deref(),
                Duration::from_millis(interval_ms),
                count,
            )
        }
        Commands::Dump {
            frequency,
            adapter,
            bytes,
            wait_ms,
            output,
        } => {
            let frequency = settings.frequency(frequency)?;
            let adapter = settings.adapter(adapter);
            commands::dump::run(
                &settings,
                frequency,
                adapter.as_deref(),
                bytes,
                Duration::from_millis(wait_ms),
                &output,
            )
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<dvbio::Error>() {
                Some(err) => match err.os_code() {
                    Some(os) => error!("{} (error code: {}, os error {})", err, u16::from(err.code()), os),
                    None => error!("{} (error code: {})", err, u16::from(err.code())),
                },
                None => error!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}
