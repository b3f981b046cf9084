use archive_files::commands::{self, Cli};
use archive_files::constants::EX_FAILURE;
use archive_files::logger::Logger;
use clap::Parser;
use std::process;
use std::time::Instant;

/// Entry point for the archive_files CLI application.
/// Parses command-line arguments and dispatches to the selected mode.
fn main() {
    let started = Instant::now();
    let cli = Cli::parse();
    let logger = Logger::stdout();

    if let Err(e) = commands::dispatch(cli, &logger, started) {
        logger.error(e.to_string());
        process::exit(EX_FAILURE);
    }
}
