//! Command-line interface definition for archive-files.
//!
//! This module defines the CLI flags and the handler behind each mode:
//! creating a configuration template, validating a configuration, decrypting
//! an archive, and the default archive run.

use crate::cipher::ExternalCipher;
use crate::config::{self, Config};
use crate::duration::human_readable_duration;
use crate::logger::Logger;
use crate::pipeline::{self, Pipeline};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Copies files and folders into a password protected archive and moves the
/// archive to a target destination.
#[derive(Parser, Debug)]
#[command(name = "archive_files", version, about, long_about = None)]
pub struct Cli {
    /// Backup configuration file.
    pub config_file: PathBuf,
    /// Create a new backup configuration file.
    #[arg(short, long, conflicts_with_all = ["validate", "decrypt"])]
    pub create_config: bool,
    /// Validate the JSON configuration file without performing a backup.
    #[arg(short, long, conflicts_with = "decrypt")]
    pub validate: bool,
    /// Decrypt an encrypted archive file.
    #[arg(short, long, value_name = "PATH")]
    pub decrypt: Option<PathBuf>,
    /// Follow symbolic links when archiving (symlinks are skipped by default).
    #[arg(short, long)]
    pub follow_symlinks: bool,
}

/// Runs the mode selected on the command line.
///
/// # Errors
/// Returns the first fatal error of the selected mode.
pub fn dispatch(cli: Cli, logger: &Logger, started: Instant) -> Result<()> {
    if cli.create_config {
        return create_config(&cli.config_file, logger);
    }
    if cli.validate {
        return validate(&cli.config_file, logger);
    }

    let mut config = Config::load(&cli.config_file)?;
    if cli.follow_symlinks {
        config.follow_symlinks = true;
    }

    match cli.decrypt {
        Some(input) => decrypt(&config, &input, logger),
        None => archive(&config, logger, started),
    }
}

/// Writes a template configuration file.
pub fn create_config(path: &Path, logger: &Logger) -> Result<()> {
    let written = config::create_default_config_file(path)?;
    logger.info(format!("Configuration created at \"{}\"", written.display()));
    Ok(())
}

/// Loads the configuration file to check that it parses.
pub fn validate(path: &Path, logger: &Logger) -> Result<()> {
    Config::load(path)?;
    logger.info(format!("Configuration file \"{}\" validated", path.display()));
    Ok(())
}

/// Decrypts `input` with the configured tool and passphrase.
pub fn decrypt(config: &Config, input: &Path, logger: &Logger) -> Result<()> {
    let gateway = ExternalCipher::new(config.encryption_method);
    pipeline::decrypt_file(config, &gateway, input, logger)?;
    Ok(())
}

/// Runs the full archive pipeline and reports how long it took.
pub fn archive(config: &Config, logger: &Logger, started: Instant) -> Result<()> {
    let gateway = ExternalCipher::new(config.encryption_method);
    Pipeline::new(config, logger, &gateway).run()?;
    logger.info(format!(
        "Archive completed in {}",
        human_readable_duration(started.elapsed().as_secs_f64())
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let args = ["archive_files", "backup.json", "-f", "-d", "Backup.zip.enc"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config_file, PathBuf::from("backup.json"));
        assert!(cli.follow_symlinks);
        assert_eq!(cli.decrypt, Some(PathBuf::from("Backup.zip.enc")));
        assert!(!cli.create_config);
        assert!(!cli.validate);
    }

    #[test]
    fn test_config_file_is_required() {
        assert!(Cli::try_parse_from(["archive_files", "--validate"]).is_err());
    }

    #[test]
    fn test_modes_conflict() {
        assert!(Cli::try_parse_from(["archive_files", "backup.json", "-c", "-v"]).is_err());
    }
}
