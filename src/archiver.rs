//! Archive writer.
//!
//! Walks the configured target paths, applies the [`PathFilter`] to every
//! entry and streams the files that qualify into a deflate-compressed zip
//! container. Each entry produces an [`EntryOutcome`] that is folded into the
//! writer's [`RunStatistics`]. A failure on one file never stops the run, but
//! a failure to open or finalize the container does.

use crate::config::Config;
use crate::constants::{ARCHIVE_EXTENSION, FAILED_FILES_DISPLAY_LIMIT};
use crate::logger::Logger;
use crate::path_filter::{PathDecision, PathFilter, SkipReason};
use crate::path_util::{member_name, resolve};
use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::result::{ZipError, ZipResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files at or above this size are written as zip64 entries.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Returns the archive location for this run.
///
/// The file name is `<prefix>.zip`, or `<prefix>-<timestamp>.zip` when
/// timestamps are enabled, placed in the configured output folder or the
/// current directory. Does not touch the filesystem.
pub fn archive_path(config: &Config, logger: &Logger) -> PathBuf {
    let file_name = if config.timestamp {
        format!(
            "{}-{}.{ARCHIVE_EXTENSION}",
            config.archive_prefix,
            logger.full_timestamp()
        )
    } else {
        format!("{}.{ARCHIVE_EXTENSION}", config.archive_prefix)
    };

    match config.output_folder() {
        Some(folder) => folder.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Why a single file could not be archived.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Zip(#[from] ZipError),
}

/// Result of handling one filesystem entry.
#[derive(Debug)]
pub enum EntryOutcome {
    Archived,
    /// Left out of the archive; only skips with a reason are reported and counted.
    Skipped(Option<SkipReason>),
    Failed(EntryError),
}

/// Counters for one archiving run.
#[derive(Debug, Default)]
pub struct RunStatistics {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    /// Every failed path, in the order the failures happened.
    pub failed_files: Vec<PathBuf>,
}

impl RunStatistics {
    /// Folds the outcome for `path` into the counters, logging skips and failures.
    pub fn record(&mut self, path: &Path, outcome: EntryOutcome, logger: &Logger) {
        match outcome {
            EntryOutcome::Archived => self.files_processed += 1,
            EntryOutcome::Skipped(None) => {}
            EntryOutcome::Skipped(Some(reason)) => {
                logger.info(format!("Skipping {reason} \"{}\"", path.display()));
                self.files_skipped += 1;
            }
            EntryOutcome::Failed(err) => {
                logger.error(format!("Error archiving file '{}': {err}", path.display()));
                self.files_failed += 1;
                self.failed_files.push(path.to_path_buf());
            }
        }
    }

    /// Logs processed and skipped counts, and the first failed files if any.
    pub fn log_summary(&self, logger: &Logger) {
        logger.info(format!(
            "Archive summary: {} files processed, {} files skipped",
            self.files_processed, self.files_skipped
        ));
        if self.files_failed == 0 {
            return;
        }

        logger.error(format!("{} files failed to archive", self.files_failed));
        let shown = self
            .failed_files
            .iter()
            .take(FAILED_FILES_DISPLAY_LIMIT)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if self.failed_files.len() > FAILED_FILES_DISPLAY_LIMIT {
            logger.error(format!(
                "First {FAILED_FILES_DISPLAY_LIMIT} failed files: {shown}"
            ));
            logger.error(format!(
                "... and {} more",
                self.failed_files.len() - FAILED_FILES_DISPLAY_LIMIT
            ));
        } else {
            logger.error(format!("Failed files: {shown}"));
        }
    }
}

/// Writes target paths into one archive container.
pub struct ArchiveWriter<'a> {
    config: &'a Config,
    logger: &'a Logger,
    filter: PathFilter,
    stats: RunStatistics,
}

impl<'a> ArchiveWriter<'a> {
    /// # Errors
    /// Fails if an ignore pattern does not compile.
    pub fn new(config: &'a Config, logger: &'a Logger) -> Result<Self> {
        Ok(Self {
            config,
            logger,
            filter: PathFilter::from_config(config)?,
            stats: RunStatistics::default(),
        })
    }

    /// Adds the file or directory at `target` to the archive at `archive`,
    /// creating the container if needed and appending to it otherwise.
    ///
    /// A missing target is reported and leaves the archive untouched.
    ///
    /// # Errors
    /// Returns [`Error::Container`] if the container cannot be opened or
    /// finalized. Failures on individual files are only recorded.
    pub fn add_to_archive(&mut self, archive: &Path, target: &Path) -> Result<()> {
        if !target.exists() {
            self.logger.error(format!(
                "\"{}\" does not exist - unable to archive",
                target.display()
            ));
            return Ok(());
        }
        self.logger.info(format!("Archiving \"{}\"", target.display()));

        let container_error = |source| Error::Container {
            path: archive.to_path_buf(),
            source,
        };
        let mut zip = open_container(archive).map_err(container_error)?;
        let container = resolve(archive);
        if target.is_dir() {
            self.add_directory(&mut zip, target, &container);
        } else {
            let outcome = self.add_file(&mut zip, target, &container);
            self.stats.record(target, outcome, self.logger);
        }
        zip.finish().map_err(container_error)?;
        Ok(())
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Logs the summary and hands back the statistics.
    pub fn finish(self) -> RunStatistics {
        self.stats.log_summary(self.logger);
        self.stats
    }

    fn add_directory<W: Write + Seek>(
        &mut self,
        zip: &mut ZipWriter<W>,
        root: &Path,
        container: &Path,
    ) {
        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter();

        while let Some(result) = walker.next() {
            let (path, outcome) = match result {
                Ok(entry) if entry.file_type().is_dir() => match self.filter.decide(entry.path()) {
                    PathDecision::SkipWithReason(reason) => {
                        walker.skip_current_dir();
                        (entry.into_path(), EntryOutcome::Skipped(Some(reason)))
                    }
                    _ => continue,
                },
                Ok(entry) => {
                    let outcome = self.add_file(zip, entry.path(), container);
                    (entry.into_path(), outcome)
                }
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    (path, EntryOutcome::Failed(err.into()))
                }
            };
            self.stats.record(&path, outcome, self.logger);
        }
    }

    /// `container` is the resolved path of the archive being written; it is
    /// never stored inside itself.
    fn add_file<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        path: &Path,
        container: &Path,
    ) -> EntryOutcome {
        if resolve(path) == container {
            return EntryOutcome::Skipped(None);
        }
        match self.filter.decide(path) {
            PathDecision::Include => match self.store_file(zip, path) {
                Ok(()) => EntryOutcome::Archived,
                Err(err) => EntryOutcome::Failed(err),
            },
            PathDecision::SkipSilent => EntryOutcome::Skipped(None),
            PathDecision::SkipWithReason(reason) => EntryOutcome::Skipped(Some(reason)),
            PathDecision::Error(err) => EntryOutcome::Failed(err.into()),
        }
    }

    fn store_file<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        path: &Path,
    ) -> std::result::Result<(), EntryError> {
        let mut file = File::open(path)?;
        let metadata = file.metadata()?;

        let level = self.config.compression_level();
        let options = if level == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(level))
        };
        let options = options.large_file(metadata.len() >= ZIP64_THRESHOLD);
        #[cfg(unix)]
        let options = {
            use std::os::unix::fs::PermissionsExt;
            options.unix_permissions(metadata.permissions().mode())
        };

        zip.start_file(member_name(path), options)?;
        if let Err(err) = io::copy(&mut file, zip) {
            // Drop the partial member so the container only holds complete files.
            zip.abort_file()?;
            return Err(err.into());
        }
        Ok(())
    }
}

fn open_container(path: &Path) -> ZipResult<ZipWriter<File>> {
    if path.exists() {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        return ZipWriter::new_append(file);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(ZipWriter::new(File::create_new(path)?))
}
