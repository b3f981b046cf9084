use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::{env, fs};

/// Expands a leading `~` or `$HOME` to the user's home directory.
///
/// Paths without such a prefix, or when no home directory can be found,
/// are returned unchanged.
pub fn expand_home(input: &str) -> PathBuf {
    for prefix in ["~", "$HOME"] {
        if let Some(rest) = input.strip_prefix(prefix) {
            if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
                continue;
            }
            if let Some(home) = dirs::home_dir() {
                return home.join(rest.trim_start_matches(['/', '\\']));
            }
        }
    }
    PathBuf::from(input)
}

/// Resolves a path to an absolute form for equality checks.
///
/// Existing paths are canonicalized, so symbolic links are resolved.
/// Missing paths fall back to a lexical absolute path. An empty path
/// stands for the current directory.
pub fn resolve(path: &Path) -> PathBuf {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| {
            env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        })
}

/// Archive member name for a path: its components relative to the
/// filesystem root, joined with `/`.
///
/// Drive prefixes, the root, `.` and `..` components are dropped, so
/// `/home/user/a.txt` becomes `home/user/a.txt` and `docs/./b.txt`
/// becomes `docs/b.txt`.
pub fn member_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Appends `.extension` to the file name, keeping any existing extension.
pub fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

/// Removes the last extension from the file name: `Backup.zip.enc` becomes `Backup.zip`.
pub fn strip_extension(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(stem),
        None => path.to_path_buf(),
    }
}
