//! Per-session drain files.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::drain::{Drain, RawDrain, StructuredDrain};
use crate::error::{ConfigurationError, Result};

/// On-disk layout of a session drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainFormat {
    /// Raw byte dump, reads and writes interleaved.
    Raw,
    /// One JSON event per line.
    #[default]
    Structured,
}

impl DrainFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DrainFormat::Raw => "bin",
            DrainFormat::Structured => "jsonl",
        }
    }
}

/// Drain file path for a session started at `now`.
pub fn session_drain_path(dir: &Path, format: DrainFormat, now: SystemTime) -> PathBuf {
    let nanos = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    dir.join(format!("x32comm-audit-{nanos}.{}", format.extension()))
}

/// Create a fresh drain file in `dir`.
///
/// The file must not exist yet; a collision is reported rather than
/// appending to another session's log.
pub fn open_session_drain(dir: &Path, format: DrainFormat) -> Result<(PathBuf, Box<dyn Drain>)> {
    let path = session_drain_path(dir, format, SystemTime::now());
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| ConfigurationError::DrainOpen {
            path: path.clone(),
            source,
        })?;

    let drain: Box<dyn Drain> = match format {
        DrainFormat::Raw => Box::new(RawDrain::<File>::new(file)),
        DrainFormat::Structured => Box::new(StructuredDrain::<File>::new(file)),
    };
    info!(path = %path.display(), ?format, "opened audit drain");
    Ok((path, drain))
}
