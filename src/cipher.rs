//! Encryption through external cipher tools.
//!
//! Both supported tools are driven through the same three operations of
//! [`EncryptionGateway`]. A gateway never reports a refused run as an error:
//! it logs why and leaves the output file missing, and callers treat the
//! presence of the output file as the only proof of success.

use crate::config::EncryptionMethod;
use crate::logger::Logger;
use crate::{Error, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Environment variable used to hand the passphrase to openssl.
const PASSPHRASE_ENV: &str = "ARCHIVE_FILES_PASSPHRASE";
/// PBKDF2 iteration count for openssl key derivation.
const PBKDF2_ITERATIONS: &str = "10000";

/// Capability to encrypt and decrypt files with a passphrase.
pub trait EncryptionGateway {
    /// Encrypts `input` into `output`.
    ///
    /// # Errors
    /// Only when the tool runs and fails. A missing input, an existing output
    /// or an unreachable tool is logged and returns `Ok(())`.
    fn encrypt(&self, input: &Path, output: &Path, passphrase: &str, logger: &Logger) -> Result<()>;

    /// Decrypts `input` into `output`, with the same error contract as [`EncryptionGateway::encrypt`].
    fn decrypt(&self, input: &Path, output: &Path, passphrase: &str, logger: &Logger) -> Result<()>;

    /// Whether the underlying tool can be invoked.
    fn is_tool_available(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Direction::Encrypt => "encrypt",
            Direction::Decrypt => "decrypt",
        }
    }

    fn progressive(self) -> &'static str {
        match self {
            Direction::Encrypt => "Encrypting",
            Direction::Decrypt => "Decrypting",
        }
    }
}

/// Gateway backed by the `openssl` or `gpg` binary.
#[derive(Debug, Clone)]
pub struct ExternalCipher {
    method: EncryptionMethod,
    program: OsString,
}

impl ExternalCipher {
    /// Uses the tool's default program name, looked up on `PATH`.
    pub fn new(method: EncryptionMethod) -> Self {
        let program = match method {
            EncryptionMethod::OpenSsl => "openssl",
            EncryptionMethod::Gpg => "gpg",
        };
        Self::with_program(method, program)
    }

    /// Drives `program` with the argument conventions of `method`.
    pub fn with_program(method: EncryptionMethod, program: impl Into<OsString>) -> Self {
        Self {
            method,
            program: program.into(),
        }
    }

    pub fn method(&self) -> EncryptionMethod {
        self.method
    }

    fn tool_name(&self) -> &'static str {
        match self.method {
            EncryptionMethod::OpenSsl => "Openssl",
            EncryptionMethod::Gpg => "GPG",
        }
    }

    fn command(&self, direction: Direction, input: &Path, output: &Path, passphrase: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        match self.method {
            EncryptionMethod::OpenSsl => {
                cmd.args(["enc", "-aes-256-cbc", "-md", "sha512", "-pbkdf2", "-iter"])
                    .arg(PBKDF2_ITERATIONS)
                    .arg("-salt")
                    .arg("-pass")
                    .arg(format!("env:{PASSPHRASE_ENV}"))
                    .env(PASSPHRASE_ENV, passphrase)
                    .arg("-in")
                    .arg(input)
                    .arg("-out")
                    .arg(output);
                if direction == Direction::Decrypt {
                    cmd.arg("-d");
                }
            }
            EncryptionMethod::Gpg => {
                cmd.args(["--batch", "--pinentry-mode", "loopback", "--passphrase-fd", "0"])
                    .args(["--cipher-algo", "AES256", "--output"])
                    .arg(output)
                    .arg(match direction {
                        Direction::Encrypt => "-c",
                        Direction::Decrypt => "--decrypt",
                    })
                    .arg(input);
            }
        }
        cmd
    }

    /// Bytes fed to the tool's standard input; gpg reads the passphrase there.
    fn stdin_payload(&self, passphrase: &str) -> Option<String> {
        match self.method {
            EncryptionMethod::OpenSsl => None,
            EncryptionMethod::Gpg => Some(format!("{passphrase}\n")),
        }
    }

    fn version_arg(&self) -> &'static str {
        match self.method {
            EncryptionMethod::OpenSsl => "version",
            EncryptionMethod::Gpg => "--version",
        }
    }

    fn transform(
        &self,
        direction: Direction,
        input: &Path,
        output: &Path,
        passphrase: &str,
        logger: &Logger,
    ) -> Result<()> {
        let verb = direction.verb();
        if !input.exists() {
            logger.error(format!(
                "Input path \"{}\" does not exist - unable to {verb} file",
                input.display()
            ));
            return Ok(());
        }
        if output.exists() {
            logger.error(format!(
                "Output path \"{}\" already exists - unable to {verb} file",
                output.display()
            ));
            return Ok(());
        }
        if !self.is_tool_available() {
            logger.error(format!(
                "{} is not accessible through the PATH variable - unable to {verb} archive",
                self.tool_name()
            ));
            return Ok(());
        }

        logger.info(format!(
            "{} file \"{}\" into \"{}\"",
            direction.progressive(),
            input.display(),
            output.display()
        ));
        let program = Path::new(&self.program);
        let mut child = self
            .command(direction, input, output, passphrase)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::io("run", program, e))?;
        // stdin closes when the handle drops.
        if let Some(mut stdin) = child.stdin.take() {
            if let Some(payload) = self.stdin_payload(passphrase) {
                stdin
                    .write_all(payload.as_bytes())
                    .map_err(|e| Error::io("write", program, e))?;
            }
        }
        let result = child
            .wait_with_output()
            .map_err(|e| Error::io("run", program, e))?;
        if !result.status.success() {
            return Err(Error::ToolFailed {
                tool: self.program.to_string_lossy().into_owned(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if direction == Direction::Decrypt {
            logger.info("Decryption complete");
        }
        Ok(())
    }
}

impl EncryptionGateway for ExternalCipher {
    fn encrypt(&self, input: &Path, output: &Path, passphrase: &str, logger: &Logger) -> Result<()> {
        self.transform(Direction::Encrypt, input, output, passphrase, logger)
    }

    fn decrypt(&self, input: &Path, output: &Path, passphrase: &str, logger: &Logger) -> Result<()> {
        self.transform(Direction::Decrypt, input, output, passphrase, logger)
    }

    fn is_tool_available(&self) -> bool {
        Command::new(&self.program)
            .arg(self.version_arg())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::test_logger;
    use std::fs;
    use tempfile::tempdir;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_openssl_arguments() {
        let cipher = ExternalCipher::new(EncryptionMethod::OpenSsl);
        let cmd = cipher.command(
            Direction::Encrypt,
            Path::new("Backup.zip"),
            Path::new("Backup.zip.enc"),
            "secret",
        );
        assert_eq!(cmd.get_program(), "openssl");
        let args = args_of(&cmd);
        assert_eq!(
            args,
            vec![
                "enc", "-aes-256-cbc", "-md", "sha512", "-pbkdf2", "-iter", "10000", "-salt",
                "-pass", "env:ARCHIVE_FILES_PASSPHRASE", "-in", "Backup.zip", "-out",
                "Backup.zip.enc",
            ]
        );
        assert!(!args.iter().any(|a| a == "secret"));

        let cmd = cipher.command(
            Direction::Decrypt,
            Path::new("Backup.zip.enc"),
            Path::new("Backup.zip"),
            "secret",
        );
        assert_eq!(args_of(&cmd).last().map(String::as_str), Some("-d"));
    }

    #[test]
    fn test_gpg_arguments() {
        let cipher = ExternalCipher::new(EncryptionMethod::Gpg);
        let cmd = cipher.command(
            Direction::Decrypt,
            Path::new("Backup.zip.enc"),
            Path::new("Backup.zip"),
            "secret",
        );
        assert_eq!(cmd.get_program(), "gpg");
        let args = args_of(&cmd);
        assert_eq!(
            args,
            vec![
                "--batch", "--pinentry-mode", "loopback", "--passphrase-fd", "0",
                "--cipher-algo", "AES256", "--output", "Backup.zip", "--decrypt",
                "Backup.zip.enc",
            ]
        );
        assert!(!args.iter().any(|a| a.contains("secret")));
        assert_eq!(cipher.stdin_payload("secret").as_deref(), Some("secret\n"));
    }

    #[test]
    fn test_openssl_reads_nothing_from_stdin() {
        let cipher = ExternalCipher::new(EncryptionMethod::OpenSsl);
        assert_eq!(cipher.stdin_payload("secret"), None);
    }

    #[test]
    fn test_unavailable_tool_is_logged_not_raised() {
        let (logger, sink) = test_logger();
        let dir = tempdir().unwrap();
        let input = dir.path().join("Backup.zip");
        fs::write(&input, "archive").unwrap();
        let output = dir.path().join("Backup.zip.enc");

        let cipher = ExternalCipher::with_program(
            EncryptionMethod::OpenSsl,
            "archive-files-missing-cipher-tool",
        );
        assert!(!cipher.is_tool_available());
        cipher.encrypt(&input, &output, "secret", &logger).unwrap();

        assert!(!output.exists());
        assert!(
            sink.contents()
                .contains("Openssl is not accessible through the PATH variable")
        );
    }

    #[test]
    fn test_missing_input_and_existing_output_are_refused() {
        let (logger, sink) = test_logger();
        let dir = tempdir().unwrap();
        let cipher = ExternalCipher::new(EncryptionMethod::Gpg);

        let missing = dir.path().join("missing.zip");
        let output = dir.path().join("missing.zip.enc");
        cipher.encrypt(&missing, &output, "secret", &logger).unwrap();
        assert!(!output.exists());
        assert!(sink.contents().contains("does not exist - unable to encrypt file"));

        let input = dir.path().join("Backup.zip.enc");
        fs::write(&input, "cipher text").unwrap();
        let existing = dir.path().join("Backup.zip");
        fs::write(&existing, "keep me").unwrap();
        cipher.decrypt(&input, &existing, "secret", &logger).unwrap();
        assert_eq!(fs::read_to_string(&existing).unwrap(), "keep me");
        assert!(sink.contents().contains("already exists - unable to decrypt file"));
    }

    #[test]
    fn test_openssl_round_trip() {
        let cipher = ExternalCipher::new(EncryptionMethod::OpenSsl);
        if !cipher.is_tool_available() {
            return;
        }
        let (logger, _) = test_logger();
        let dir = tempdir().unwrap();
        let plain = dir.path().join("Backup.zip");
        fs::write(&plain, "archive bytes").unwrap();
        let encrypted = dir.path().join("Backup.zip.enc");
        let restored = dir.path().join("restored.zip");

        cipher.encrypt(&plain, &encrypted, "secret", &logger).unwrap();
        assert!(encrypted.exists());
        assert_ne!(fs::read(&encrypted).unwrap(), b"archive bytes");

        cipher.decrypt(&encrypted, &restored, "secret", &logger).unwrap();
        assert_eq!(fs::read_to_string(&restored).unwrap(), "archive bytes");
    }
}
