//! Archive configuration.
//!
//! This module defines the JSON configuration document read at the start of
//! every run, its documented defaults, and the helpers behind the
//! `--create-config` and `--validate` modes.

use crate::constants::{CONFIG_EXTENSION, MAX_COMPRESS_LEVEL, MIN_COMPRESS_LEVEL};
use crate::path_util::expand_home;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// External tool used to encrypt the finished archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMethod {
    #[default]
    OpenSsl,
    Gpg,
}

impl EncryptionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            EncryptionMethod::OpenSsl => "openssl",
            EncryptionMethod::Gpg => "gpg",
        }
    }
}

impl fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openssl" => Ok(EncryptionMethod::OpenSsl),
            "gpg" => Ok(EncryptionMethod::Gpg),
            _ => Err(Error::UnknownEncryptionMethod(s.to_string())),
        }
    }
}

impl Serialize for EncryptionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EncryptionMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Options for one archive run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Folder the finished archive is copied to. Empty disables relocation.
    #[serde(default)]
    pub destination_folder: String,
    /// Files and directories to archive.
    pub target_paths: Vec<String>,
    /// Passphrase for the cipher tool. Empty disables encryption.
    #[serde(default)]
    pub passphrase: String,
    #[serde(default)]
    pub encryption_method: EncryptionMethod,
    /// File name prefix of the archive.
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
    /// Append a timestamp to the archive file name.
    #[serde(default = "default_true")]
    pub timestamp: bool,
    /// Deflate level, clamped by [`Config::compression_level`].
    #[serde(default = "default_compress_level")]
    pub compress_level: i64,
    /// Delete local artifacts once they are encrypted or relocated.
    #[serde(default)]
    pub cleanup: bool,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Folder the archive is written to. Empty means the current directory.
    #[serde(default)]
    pub compression_folder: String,
    /// Glob patterns matched against file and directory names and full paths.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_archive_prefix() -> String {
    "Backup".to_string()
}

fn default_true() -> bool {
    true
}

fn default_compress_level() -> i64 {
    MAX_COMPRESS_LEVEL
}

impl Config {
    /// Document written by `--create-config`.
    pub fn template() -> Self {
        Self {
            destination_folder: String::new(),
            target_paths: vec![String::new()],
            passphrase: "password".to_string(),
            encryption_method: EncryptionMethod::OpenSsl,
            archive_prefix: default_archive_prefix(),
            timestamp: true,
            compress_level: MAX_COMPRESS_LEVEL,
            cleanup: false,
            follow_symlinks: false,
            compression_folder: String::new(),
            ignore_patterns: vec![],
        }
    }

    /// Builds a configuration from an already parsed JSON document.
    ///
    /// # Errors
    /// Returns [`Error::MissingKey`] when `target_paths` is absent and
    /// [`Error::NoTargets`] when it is empty.
    pub fn from_value(value: Value) -> std::result::Result<Self, ConfigError> {
        if value.get("target_paths").is_none() {
            return Err(Error::MissingKey("target_paths").into());
        }
        let config: Config = serde_json::from_value(value)?;
        if config.target_paths.is_empty() {
            return Err(Error::NoTargets.into());
        }
        Ok(config)
    }

    /// Parses a JSON document, see [`Config::from_value`].
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    /// Fails if the file does not exist, is not valid JSON or lacks required keys.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|e| Error::io("read", path, e))?;
        Self::from_json_str(&json).map_err(|e| match e {
            ConfigError::Json(source) => Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            ConfigError::Invalid(err) => err,
        })
    }

    /// Compression level clamped into the valid deflate range.
    pub fn compression_level(&self) -> i64 {
        self.compress_level.clamp(MIN_COMPRESS_LEVEL, MAX_COMPRESS_LEVEL)
    }

    pub fn target_paths(&self) -> Vec<PathBuf> {
        self.target_paths.iter().map(|p| expand_home(p)).collect()
    }

    pub fn destination(&self) -> Option<PathBuf> {
        non_empty_path(&self.destination_folder)
    }

    pub fn output_folder(&self) -> Option<PathBuf> {
        non_empty_path(&self.compression_folder)
    }

    pub fn encrypts(&self) -> bool {
        !self.passphrase.is_empty()
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(expand_home(value))
    }
}

/// Failure to turn a JSON document into a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Not JSON, or a field has the wrong type.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Well-formed JSON that violates a configuration rule.
    #[error(transparent)]
    Invalid(#[from] Error),
}

/// Path `--create-config` writes to: `path` with its extension forced to `.json`.
pub fn config_file_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == CONFIG_EXTENSION) {
        path.to_path_buf()
    } else {
        path.with_extension(CONFIG_EXTENSION)
    }
}

/// Writes the template configuration to `path` (with a `.json` extension).
///
/// Returns the path actually written.
///
/// # Errors
/// Fails if the file already exists or cannot be written.
pub fn create_default_config_file(path: &Path) -> Result<PathBuf> {
    let file_path = config_file_path(path);
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&file_path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::ConfigExists(file_path.clone()),
            _ => Error::io("create", &file_path, e),
        })?;
    write_template(io::BufWriter::new(file), &file_path)?;
    Ok(file_path)
}

fn write_template<W: Write>(mut writer: W, path: &Path) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &Config::template())
        .map_err(io::Error::from)
        .and_then(|_| writer.write_all(b"\n"))
        .and_then(|_| writer.flush())
        .map_err(|e| Error::io("write", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_configuration_initialization() {
        let config = Config::from_json_str(
            r#"{
                "destination_folder": "example_folder/",
                "target_paths": ["test_file.txt"],
                "passphrase": "password",
                "encryption_method": "openssl",
                "archive_prefix": "test-archive",
                "timestamp": false,
                "compress_level": 5,
                "cleanup": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.destination_folder, "example_folder/");
        assert_eq!(config.target_paths, vec!["test_file.txt"]);
        assert_eq!(config.passphrase, "password");
        assert_eq!(config.encryption_method, EncryptionMethod::OpenSsl);
        assert_eq!(config.archive_prefix, "test-archive");
        assert!(!config.timestamp);
        assert_eq!(config.compress_level, 5);
        assert!(config.cleanup);
    }

    #[test]
    fn test_configuration_default_values() {
        let config = Config::from_json_str(r#"{"target_paths": ["sample_file_name.txt"]}"#).unwrap();
        assert_eq!(config.destination_folder, "");
        assert_eq!(config.passphrase, "");
        assert_eq!(config.encryption_method, EncryptionMethod::OpenSsl);
        assert_eq!(config.archive_prefix, "Backup");
        assert!(config.timestamp);
        assert_eq!(config.compress_level, 9);
        assert!(!config.cleanup);
        assert!(!config.follow_symlinks);
        assert_eq!(config.compression_folder, "");
        assert!(config.ignore_patterns.is_empty());
        assert!(config.destination().is_none());
        assert!(config.output_folder().is_none());
        assert!(!config.encrypts());
    }

    #[test]
    fn test_configuration_requires_target_paths() {
        let err = Config::from_json_str("{}").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(Error::MissingKey("target_paths"))
        ));

        let err = Config::from_json_str(r#"{"passphrase": "secret", "cleanup": true}"#).unwrap_err();
        assert!(err.to_string().contains("target_paths"));
    }

    #[test]
    fn test_configuration_rejects_empty_targets() {
        let err = Config::from_json_str(r#"{"target_paths": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(Error::NoTargets)));
    }

    #[test]
    fn test_compression_level_is_clamped() {
        let mut config = Config::from_json_str(r#"{"target_paths": ["a"]}"#).unwrap();
        config.compress_level = -3;
        assert_eq!(config.compression_level(), 0);
        config.compress_level = 42;
        assert_eq!(config.compression_level(), 9);
        config.compress_level = 4;
        assert_eq!(config.compression_level(), 4);
    }

    #[test]
    fn test_encryption_method_parsing() {
        let config =
            Config::from_json_str(r#"{"target_paths": ["a"], "encryption_method": "GPG"}"#).unwrap();
        assert_eq!(config.encryption_method, EncryptionMethod::Gpg);

        let err = Config::from_json_str(r#"{"target_paths": ["a"], "encryption_method": "rot13"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("rot13"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(matches!(Config::load(&path), Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_create_default_config_file() {
        let dir = tempdir().unwrap();
        let written = create_default_config_file(&dir.path().join("backup")).unwrap();
        assert_eq!(written, dir.path().join("backup.json"));

        let config = Config::load(&written).unwrap();
        assert_eq!(config, Config::template());
        assert_eq!(config.passphrase, "password");
        assert_eq!(config.target_paths, vec![String::new()]);

        let err = create_default_config_file(&written).unwrap_err();
        assert!(matches!(err, Error::ConfigExists(_)));
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_template_write_failure_is_an_io_error() {
        let path = Path::new("backup.json");
        let err = write_template(FullDisk, path).unwrap_err();
        assert!(!err.to_string().contains("Invalid configuration file"));
        match err {
            Error::Io {
                operation, source, ..
            } => {
                assert_eq!(operation, "write");
                assert_eq!(source.kind(), io::ErrorKind::StorageFull);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_file_path_forces_json_extension() {
        assert_eq!(
            config_file_path(Path::new("conf.txt")),
            PathBuf::from("conf.json")
        );
        assert_eq!(
            config_file_path(Path::new("conf.json")),
            PathBuf::from("conf.json")
        );
    }
}
