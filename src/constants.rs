/// Extension of the archive container.
pub const ARCHIVE_EXTENSION: &str = "zip";
/// Extension appended to the archive name once it is encrypted.
pub const ENCRYPTED_EXTENSION: &str = "enc";
/// Extension forced onto configuration files written by `--create-config`.
pub const CONFIG_EXTENSION: &str = "json";
/// Lowest accepted deflate compression level.
pub const MIN_COMPRESS_LEVEL: i64 = 0;
/// Highest accepted deflate compression level.
pub const MAX_COMPRESS_LEVEL: i64 = 9;
/// Number of failed files listed in the archive summary.
pub const FAILED_FILES_DISPLAY_LIMIT: usize = 10;
/// Exit status for every fatal condition.
pub const EX_FAILURE: i32 = 1;
