//! Error types shared by every stage of an archive run.
//!
//! Only fatal conditions are represented here. Failures of individual files
//! while archiving are recorded in [`crate::archiver::RunStatistics`] instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Unified result type for all fallible operations in archive-files.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file does not exist.
    #[error("\"{}\" does not exist - unable to load configuration file", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file is not valid JSON or has mistyped fields.
    #[error("Invalid configuration file: \"{}\": {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A required key is absent from the configuration document.
    #[error("Configuration file is missing a required key '{0}'")]
    MissingKey(&'static str),

    /// `target_paths` is present but lists nothing.
    #[error("Configuration file must list at least one target path")]
    NoTargets,

    /// `encryption_method` names an unsupported tool.
    #[error("Unsupported encryption method '{0}' - expected \"openssl\" or \"gpg\"")]
    UnknownEncryptionMethod(String),

    /// An ignore pattern is not a valid glob.
    #[error("Invalid ignore pattern \"{pattern}\": {source}")]
    IgnorePattern {
        pattern: String,
        source: globset::Error,
    },

    /// `--create-config` would overwrite an existing file.
    #[error("\"{}\" already exists - unable to create backup configuration file", .0.display())]
    ConfigExists(PathBuf),

    /// The archive about to be created is already on disk.
    #[error("Archive path \"{}\" already exists - unable to create backup archive", .0.display())]
    ArchiveExists(PathBuf),

    /// The encrypted output about to be created is already on disk.
    #[error("\"{}\" already exists - unable to output encrypted file", .0.display())]
    EncryptedExists(PathBuf),

    /// Relocation would overwrite a file in the destination folder.
    #[error("Target path \"{}\" already exists - unable to move file to destination", .0.display())]
    DestinationExists(PathBuf),

    /// The archive container itself could not be opened or finalized.
    #[error("Critical error creating archive \"{}\": {source}", .path.display())]
    Container {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// An external cipher tool ran but reported failure.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// Filesystem failure outside of per-file archiving.
    #[error("Unable to {operation} \"{}\": {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
