//! On-disk checkpoint record for one component.
//!
//! Records are JSON documents with a `version` field. Per-file entries are
//! keyed by the file identity's display form (`dev:ino` or `sha256:…`) and keep
//! the last known path and fingerprint for readability and inode-reuse checks.

use crate::model::LogFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const CHECKPOINT_VERSION: u32 = 1;

/// The instant used when a component has made no progress yet.
pub fn no_progress() -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentCheckpoint {
    pub version: u32,
    pub component: String,
    /// Every file last modified at or before this instant has been delivered.
    pub last_processed: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: BTreeMap<String, FileCheckpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCheckpoint {
    pub path: PathBuf,
    #[serde(default)]
    pub fingerprint: Option<String>,
    /// Bytes confirmed delivered from the start of the file.
    pub offset: u64,
    /// Size of the file when the offset was recorded.
    #[serde(default)]
    pub size: u64,
    /// Modification time of the file when the offset was recorded.
    pub last_modified: DateTime<Utc>,
}

impl ComponentCheckpoint {
    pub fn empty(component: impl Into<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            component: component.into(),
            last_processed: no_progress(),
            updated_at: None,
            files: BTreeMap::new(),
        }
    }

    /// Modification time of the oldest file known to be only partly delivered.
    pub fn oldest_pending(&self) -> Option<DateTime<Utc>> {
        self.files
            .values()
            .filter(|entry| entry.offset < entry.size)
            .map(|entry| entry.last_modified)
            .min()
    }

    /// Newest modification time up to which every recorded file was fully
    /// delivered, or `last_processed` when nothing moves it forward. Entries
    /// without a recorded size never count as complete.
    pub fn delivered_through(&self) -> DateTime<Utc> {
        let pending = self.oldest_pending();
        self.files
            .values()
            .filter(|entry| entry.size > 0 && entry.offset >= entry.size)
            .map(|entry| entry.last_modified)
            .filter(|modified| pending.map_or(true, |p| *modified < p))
            .max()
            .map_or(self.last_processed, |m| m.max(self.last_processed))
    }

    pub fn entry(&self, file: &LogFile) -> Option<&FileCheckpoint> {
        self.files.get(&file.identity().to_string())
    }

    /// Offset a reader should resume `file` from.
    ///
    /// A stored offset is discarded when the stored fingerprint disagrees with
    /// the file's current one (the inode was reused by a new file) or when it
    /// lies past the current end of the file (the file was truncated).
    pub fn resume_offset(&self, file: &LogFile) -> u64 {
        let Some(entry) = self.entry(file) else {
            return 0;
        };

        if let (Some(stored), Some(current)) = (entry.fingerprint.as_deref(), file.fingerprint()) {
            if stored != current {
                return 0;
            }
        }

        if entry.offset > file.size() {
            return 0;
        }

        entry.offset
    }
}
