//! Append-only JSON lines file
//!
//! Each event becomes one line of compact JSON. The file is opened on first
//! write (or eagerly via [`JsonLinesFile::open`]) and can be truncated or
//! closed while shared behind an `Arc`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::common::{Event, SinkError};

/// Write buffer size
const BUFFER_SIZE: usize = 64 * 1024;

enum FileState {
    /// Not opened yet
    Pending,
    /// Open for appending
    Open(BufWriter<File>),
    /// Closed for good
    Closed,
}

/// JSON lines file shared between writers
pub struct JsonLinesFile {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl JsonLinesFile {
    /// Create a file handle that opens lazily on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(FileState::Pending),
        }
    }

    /// Open the file immediately, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file can't be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let writer = open_append(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(FileState::Open(writer)),
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event
    pub fn append(&self, event: &Event) -> Result<(), SinkError> {
        self.append_all(std::slice::from_ref(event)).map(|_| ())
    }

    /// Append events, returning how many were written
    pub fn append_all(&self, events: &[Event]) -> Result<usize, SinkError> {
        let mut buf = Vec::with_capacity(events.len() * 128);
        for event in events {
            serde_json::to_writer(&mut buf, event)?;
            buf.push(b'\n');
        }

        self.with_writer(|writer| writer.write_all(&buf))?;
        Ok(events.len())
    }

    /// Flush buffered lines to disk
    pub fn flush(&self) -> Result<(), SinkError> {
        match &mut *self.state.lock() {
            FileState::Open(writer) => writer.flush().map_err(SinkError::from),
            FileState::Pending => Ok(()),
            FileState::Closed => Err(SinkError::closed(self.path.display().to_string())),
        }
    }

    /// Drop all lines written so far
    pub fn truncate(&self) -> Result<(), SinkError> {
        self.with_writer(|writer| {
            writer.flush()?;
            writer.get_ref().set_len(0)
        })
    }

    /// Flush and close. Later writes fail with [`SinkError::Closed`].
    pub fn close(&self) -> Result<(), SinkError> {
        let previous = std::mem::replace(&mut *self.state.lock(), FileState::Closed);
        match previous {
            FileState::Open(mut writer) => writer.flush().map_err(SinkError::from),
            FileState::Pending | FileState::Closed => Ok(()),
        }
    }

    /// Check if the file has been closed
    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), FileState::Closed)
    }

    fn with_writer<T>(
        &self,
        f: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<T>,
    ) -> Result<T, SinkError> {
        let mut state = self.state.lock();
        if matches!(*state, FileState::Pending) {
            *state = FileState::Open(open_append(&self.path)?);
        }

        match &mut *state {
            FileState::Open(writer) => f(writer).map_err(SinkError::from),
            FileState::Pending | FileState::Closed => {
                Err(SinkError::closed(self.path.display().to_string()))
            }
        }
    }
}

impl std::fmt::Debug for JsonLinesFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesFile")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn open_append(path: &Path) -> Result<BufWriter<File>, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::with_capacity(BUFFER_SIZE, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> Event {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lazy_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/events.log");
        let file = JsonLinesFile::new(&path);

        assert!(!path.exists());
        file.append(&event(json!({"a": 1}))).unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}\n");
    }

    #[test]
    fn test_append_all_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let file = JsonLinesFile::open(&path).unwrap();

        let written = file
            .append_all(&[event(json!({"n": 1})), event(json!({"n": 2}))])
            .unwrap();
        assert_eq!(written, 2);
        file.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);

        file.truncate().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        file.append(&event(json!({"n": 3}))).unwrap();
        file.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"n\":3}\n");
    }

    #[test]
    fn test_close_flushes_and_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let file = JsonLinesFile::new(&path);

        file.append(&event(json!({"k": "v"}))).unwrap();
        file.close().unwrap();
        assert!(file.is_closed());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"k\":\"v\"}\n");

        let err = file.append(&event(json!({"k": "v"}))).unwrap_err();
        assert!(matches!(err, SinkError::Closed(_)));

        // Idempotent
        file.close().unwrap();
    }

    #[test]
    fn test_close_before_open_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.log");
        let file = JsonLinesFile::new(&path);

        file.close().unwrap();
        assert!(!path.exists());
    }
}
