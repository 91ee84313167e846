use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::common::errors::{ReclaimError, ReclaimResult};

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    Delete,
}

/// One executed deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub action: JournalAction,
    pub path: PathBuf,
    /// Bytes freed, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl JournalEntry {
    pub fn deleted(path: &Path, size: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            action: JournalAction::Delete,
            path: path.to_path_buf(),
            size: Some(size),
        }
    }
}

/// Append-only deletion history, one JSON record per line.
///
/// Each append is a single write of a complete line followed by a sync, so a
/// crash can at worst leave one torn line at the end. A torn line is skipped
/// by readers and terminated before the next record is written, so it never
/// damages earlier or later entries.
#[derive(Debug)]
pub struct HistoryJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryJournal {
    /// Open (creating if needed) the journal at `path`
    pub fn open(path: impl Into<PathBuf>) -> ReclaimResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| journal_err(&path, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| journal_err(&path, e))?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one entry
    pub fn append(&self, entry: &JournalEntry) -> ReclaimResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| journal_err(&self.path, e))?;

        if !ends_with_newline(&mut file).map_err(|e| journal_err(&self.path, e))? {
            tracing::warn!(journal = %self.path.display(), "terminating torn journal record");
            line.insert(0, b'\n');
        }

        file.write_all(&line)
            .and_then(|_| file.sync_data())
            .map_err(|e| journal_err(&self.path, e))
    }

    /// Entries in the order they were written. With a limit, only the most
    /// recent `limit` entries are returned, still oldest first.
    pub fn read_all(&self, limit: Option<usize>) -> ReclaimResult<Vec<JournalEntry>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(journal_err(&self.path, e)),
        };

        let text = String::from_utf8_lossy(&bytes);
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::debug!(line = lineno + 1, error = %e, "skipping unreadable journal record")
                }
            }
        }

        if let Some(limit) = limit {
            let excess = entries.len().saturating_sub(limit);
            entries.drain(..excess);
        }
        Ok(entries)
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn journal_err(path: &Path, source: std::io::Error) -> ReclaimError {
    ReclaimError::Journal {
        path: path.to_path_buf(),
        source,
    }
}
