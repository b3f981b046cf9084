//! Archive, encrypt, relocate and clean up as one sequential run.
//!
//! Stages always execute in that order. Encryption only runs when a passphrase
//! is configured, relocation only when a destination folder differs from the
//! folder holding the artifact, and cleanup only when enabled and an artifact
//! is safe to delete.

use crate::archiver::{ArchiveWriter, RunStatistics, archive_path};
use crate::cipher::EncryptionGateway;
use crate::config::Config;
use crate::constants::ENCRYPTED_EXTENSION;
use crate::logger::Logger;
use crate::path_util::{append_extension, resolve, strip_extension};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to the artifacts of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// The plaintext archive is due to be copied to the destination.
    pub move_archive: bool,
    pub archive_moved: bool,
    /// The encrypted file exists after the encryption stage.
    pub archive_encrypted: bool,
    /// The encrypted file is due to be copied to the destination.
    pub move_encrypted: bool,
    pub encrypted_moved: bool,
    pub cleanup_archive: bool,
    pub cleanup_encrypted: bool,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub archive_path: PathBuf,
    /// Set when encryption was attempted.
    pub encrypted_path: Option<PathBuf>,
    pub statistics: RunStatistics,
    pub result: RunResult,
}

/// Coordinates the stages of one archive run.
pub struct Pipeline<'a> {
    config: &'a Config,
    logger: &'a Logger,
    gateway: &'a dyn EncryptionGateway,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, logger: &'a Logger, gateway: &'a dyn EncryptionGateway) -> Self {
        Self {
            config,
            logger,
            gateway,
        }
    }

    /// Runs every stage.
    ///
    /// # Errors
    /// Aborts on the first fatal condition: an existing archive, encrypted
    /// file or destination file, a container failure, a failing cipher tool,
    /// or a failed copy or delete. Stages after the failure do not run.
    pub fn run(&self) -> Result<RunReport> {
        let mut result = RunResult::default();

        let archive = archive_path(self.config, self.logger);
        let statistics = self.archive(&archive)?;
        result.move_archive = self.should_move_to_destination(&archive);

        let encrypted = if self.config.encrypts() {
            Some(self.encrypt(&archive, &mut result)?)
        } else {
            None
        };

        self.relocate(&archive, encrypted.as_deref(), &mut result)?;

        if self.config.cleanup {
            self.cleanup(&archive, encrypted.as_deref(), &mut result)?;
        }

        Ok(RunReport {
            archive_path: archive,
            encrypted_path: encrypted,
            statistics,
            result,
        })
    }

    fn archive(&self, archive: &Path) -> Result<RunStatistics> {
        self.logger.info(format!("Archiving files to \"{}\"", archive.display()));
        if archive.exists() {
            return Err(Error::ArchiveExists(archive.to_path_buf()));
        }

        let mut writer = ArchiveWriter::new(self.config, self.logger)?;
        for target in self.config.target_paths() {
            writer.add_to_archive(archive, &target)?;
        }
        Ok(writer.finish())
    }

    fn encrypt(&self, archive: &Path, result: &mut RunResult) -> Result<PathBuf> {
        let encrypted = append_extension(archive, ENCRYPTED_EXTENSION);
        if encrypted.exists() {
            return Err(Error::EncryptedExists(encrypted));
        }

        self.gateway
            .encrypt(archive, &encrypted, &self.config.passphrase, self.logger)?;
        result.archive_encrypted = encrypted.exists();
        // The plaintext archive never leaves once encryption was attempted.
        result.move_archive = false;
        result.move_encrypted =
            result.archive_encrypted && self.should_move_to_destination(&encrypted);

        if !result.archive_encrypted {
            self.logger
                .error("Encryption failed - preventing archive relocation to destination folder");
        }
        Ok(encrypted)
    }

    fn relocate(
        &self,
        archive: &Path,
        encrypted: Option<&Path>,
        result: &mut RunResult,
    ) -> Result<()> {
        if result.move_archive {
            self.copy_to_destination(archive)?;
            result.archive_moved = true;
        }
        if let Some(encrypted) = encrypted.filter(|_| result.move_encrypted) {
            self.copy_to_destination(encrypted)?;
            result.encrypted_moved = true;
        }
        Ok(())
    }

    fn cleanup(
        &self,
        archive: &Path,
        encrypted: Option<&Path>,
        result: &mut RunResult,
    ) -> Result<()> {
        result.cleanup_archive =
            (result.archive_encrypted || result.archive_moved) && archive.exists();
        result.cleanup_encrypted = result.archive_encrypted
            && result.encrypted_moved
            && encrypted.is_some_and(Path::exists);

        if result.cleanup_archive {
            self.delete_local(archive)?;
        }
        if let Some(encrypted) = encrypted.filter(|_| result.cleanup_encrypted) {
            self.delete_local(encrypted)?;
        }
        Ok(())
    }

    /// True when a destination is configured, `file` exists, and it does not
    /// already live in the destination folder.
    fn should_move_to_destination(&self, file: &Path) -> bool {
        let Some(destination) = self.config.destination() else {
            return false;
        };
        if !file.exists() {
            return false;
        }
        let parent = file.parent().unwrap_or_else(|| Path::new(""));
        resolve(parent) != resolve(&destination)
    }

    fn copy_to_destination(&self, source: &Path) -> Result<()> {
        let destination = self.config.destination().unwrap_or_default();
        let file_name = source.file_name().unwrap_or(source.as_os_str());
        move_file(source, &destination.join(file_name), self.logger)
    }

    fn delete_local(&self, path: &Path) -> Result<()> {
        self.logger.info(format!("Deleting local file \"{}\"", path.display()));
        fs::remove_file(path).map_err(|e| Error::io("delete", path, e))
    }
}

/// Copies `source` to `destination`, refusing to overwrite an existing file.
///
/// # Errors
/// Returns [`Error::DestinationExists`] if `destination` is already present,
/// or an I/O error if the copy fails.
pub fn move_file(source: &Path, destination: &Path, logger: &Logger) -> Result<()> {
    logger.info(format!(
        "Moving \"{}\" to \"{}\"",
        source.display(),
        destination.display()
    ));
    if destination.exists() {
        return Err(Error::DestinationExists(destination.to_path_buf()));
    }
    fs::copy(source, destination).map_err(|e| Error::io("copy", source, e))?;
    Ok(())
}

/// Decrypts `input` next to itself, dropping its last extension.
///
/// Returns the output path. Whether it was written is signalled only by its existence.
pub fn decrypt_file(
    config: &Config,
    gateway: &dyn EncryptionGateway,
    input: &Path,
    logger: &Logger,
) -> Result<PathBuf> {
    let output = strip_extension(input);
    gateway.decrypt(input, &output, &config.passphrase, logger)?;
    Ok(output)
}
