//! Inclusion policy for filesystem entries met while archiving.

use crate::config::Config;
use crate::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use std::{fmt, fs, io};

/// Kind of entry an ignore pattern matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Why an entry was left out of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A symbolic link while links are not followed.
    Symlink,
    /// The entry matched an ignore pattern.
    Ignored(EntryKind),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Symlink => f.write_str("symlink"),
            SkipReason::Ignored(EntryKind::File) => f.write_str("ignored file"),
            SkipReason::Ignored(EntryKind::Directory) => f.write_str("ignored directory"),
        }
    }
}

/// Outcome of filtering a single entry.
#[derive(Debug)]
pub enum PathDecision {
    Include,
    /// Not a regular file; nothing to store and nothing to report.
    SkipSilent,
    SkipWithReason(SkipReason),
    Error(io::Error),
}

/// Decides which entries are written to the archive.
#[derive(Debug, Clone)]
pub struct PathFilter {
    follow_symlinks: bool,
    ignore: Option<GlobSet>,
}

impl PathFilter {
    /// Compiles the ignore patterns.
    ///
    /// # Errors
    /// Returns [`Error::IgnorePattern`] for a pattern that is not a valid glob.
    pub fn new(follow_symlinks: bool, patterns: &[String]) -> Result<Self> {
        Ok(Self {
            follow_symlinks,
            ignore: build_globset(patterns)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.follow_symlinks, &config.ignore_patterns)
    }

    /// Applies, in order: the symlink rule, the ignore patterns, and the
    /// regular-file check.
    pub fn decide(&self, path: &Path) -> PathDecision {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => return PathDecision::Error(e),
        };
        if metadata.file_type().is_symlink() && !self.follow_symlinks {
            return PathDecision::SkipWithReason(SkipReason::Symlink);
        }
        if self.is_ignored(path) {
            let kind = if path.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            return PathDecision::SkipWithReason(SkipReason::Ignored(kind));
        }
        if !path.is_file() {
            return PathDecision::SkipSilent;
        }
        PathDecision::Include
    }

    /// Matches the entry name, the full path, and the full path with
    /// forward slashes against every ignore pattern.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(set) = &self.ignore else {
            return false;
        };
        if path.file_name().is_some_and(|name| set.is_match(name)) {
            return true;
        }
        if set.is_match(path) {
            return true;
        }
        let normalized = path.to_string_lossy().replace('\\', "/");
        set.is_match(normalized.as_str())
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|source| Error::IgnorePattern {
            pattern: pattern.clone(),
            source,
        })?);
    }
    let set = builder.build().map_err(|source| Error::IgnorePattern {
        pattern: patterns.join(", "),
        source,
    })?;
    Ok(Some(set))
}
