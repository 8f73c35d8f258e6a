//! JSON file cache of retrieved events.
//!
//! The cache holds a single [`EventList`] in the same shape the Calendar API
//! returns. Once written it is used as-is: callers load from it instead of
//! fetching whenever the file exists.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ct_core::EventList;
use fs2::FileExt;
use thiserror::Error;

/// Cache file errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access cache file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cache file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Loads cached events. Returns `Ok(None)` if the cache file does not exist.
pub fn load(path: &Path) -> Result<Option<EventList>, CacheError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };
    FileExt::lock_shared(&file).map_err(|e| CacheError::io(path, e))?;

    let events: EventList =
        serde_json::from_reader(BufReader::new(&file)).map_err(|source| CacheError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), events = events.items.len(), "loaded event cache");
    Ok(Some(events))
}

/// Writes events to the cache, replacing any previous content.
///
/// Holds an exclusive lock while writing so a concurrent reader never sees
/// a partial file.
pub fn store(path: &Path, events: &EventList) -> Result<(), CacheError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CacheError::io(path, e))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| CacheError::io(path, e))?;
    file.lock_exclusive().map_err(|e| CacheError::io(path, e))?;
    // Truncate only once the lock is held.
    file.set_len(0).map_err(|e| CacheError::io(path, e))?;

    let mut writer = BufWriter::new(&file);
    serde_json::to_writer_pretty(&mut writer, events).map_err(|source| CacheError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(|e| CacheError::io(path, e))?;
    writer.flush().map_err(|e| CacheError::io(path, e))?;

    tracing::debug!(path = %path.display(), events = events.items.len(), "stored event cache");
    Ok(())
}
