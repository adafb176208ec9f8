//! hlsmux command line.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use hlsmux_core::logging::{init_tracing, init_tracing_with_file};

use crate::cli::{Args, Commands};

fn main() -> ExitCode {
    let args = Args::parse();
    let level = args.log_level();

    let config = match commands::open_config(&args.config, &args.command) {
        Ok(config) => config,
        Err(err) => {
            init_tracing(level);
            tracing::error!("{:#}", err);
            return ExitCode::from(commands::exit_code(&err));
        }
    };

    // Only conversions write the application log file
    let _log_guard = if matches!(args.command, Commands::Convert { .. }) {
        init_tracing_with_file(level, &config.logs_folder())
    } else {
        init_tracing(level);
        None
    };

    tracing::debug!("hlsmux {}", hlsmux_core::version());

    match commands::execute(args.command, config, level) {
        Ok(()) => ExitCode::from(commands::exit::OK),
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::from(commands::exit_code(&err))
        }
    }
}
