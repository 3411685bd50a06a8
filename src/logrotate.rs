//! Housekeeping for rotated log files.
//!
//! The service appends to a single configured log file and leaves rotation
//! to logrotate or similar; this companion walks the log directory, deletes
//! rotated files (`{logfile}.{suffix}`) older than the retention window and
//! gzip-compresses the remaining uncompressed ones. It runs from the
//! `expire-logs` subcommand, typically under cron.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::warn;

/// Rotated files older than this are deleted.
pub const LOG_RETENTION: Duration = Duration::from_secs(7 * 86_400);

/// What one expiry run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExpireSummary {
    pub deleted: usize,
    pub compressed: usize,
}

/// Expire and compress rotated companions of `logfile`.
///
/// A `logfile` of `console`, `null` or `/dev/null` means the service does
/// not log to a file and there is nothing to do. Files that cannot be
/// inspected or processed are skipped with a diagnostic; one bad file does
/// not abort the run.
pub fn expire_logs(logfile: &str) -> io::Result<ExpireSummary> {
    let mut summary = ExpireSummary::default();

    if matches!(logfile, "console" | "null" | "/dev/null") {
        return Ok(summary);
    }

    let logfile = Path::new(logfile);
    let log_dir = logfile.parent().filter(|p| !p.as_os_str().is_empty());
    let log_dir = log_dir.unwrap_or(Path::new("."));
    let Some(basename) = logfile.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(summary);
    };
    let prefix = format!("{}.", basename);

    let now = SystemTime::now();

    for entry in fs::read_dir(log_dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "cannot read log directory entry, skipping");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) {
            continue;
        }
        let path = entry.path();

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(error) => {
                warn!(path = %path.display(), %error, "cannot stat rotated log, skipping");
                continue;
            }
        };

        if expired(modified, now) {
            match fs::remove_file(&path) {
                Ok(()) => summary.deleted += 1,
                Err(error) => warn!(path = %path.display(), %error, "cannot delete rotated log"),
            }
            continue;
        }

        if name.ends_with(".gz") {
            continue;
        }

        match compress(&path) {
            Ok(()) => summary.compressed += 1,
            Err(error) => warn!(path = %path.display(), %error, "cannot compress rotated log"),
        }
    }

    Ok(summary)
}

/// Whether a rotated file has outlived the retention window.
fn expired(modified: SystemTime, now: SystemTime) -> bool {
    now.duration_since(modified)
        .map(|age| age > LOG_RETENTION)
        .unwrap_or(false)
}

/// Gzip a rotated file in place: write `{path}.gz`, then remove the original.
fn compress(path: &Path) -> io::Result<()> {
    let mut input = io::BufReader::new(fs::File::open(path)?);
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));

    let output = fs::File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
}

// =============================================================================
// Tests
// =============================================================================
