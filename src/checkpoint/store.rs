use super::schema::{ComponentCheckpoint, FileCheckpoint, CHECKPOINT_VERSION};
use crate::model::{FileIdentity, LogFile, LogFileGroup};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const CHECKPOINT_DIR: &str = "checkpoints";

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid checkpoint json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid checkpoint version: {0}")]
    InvalidVersion(u32),

    #[error("checkpoint belongs to component '{found}', expected '{expected}'")]
    ComponentMismatch { expected: String, found: String },

    #[error("offset {offset} is beyond the end of file {identity} ({size} bytes)")]
    OffsetBeyondEnd {
        identity: FileIdentity,
        offset: u64,
        size: u64,
    },
}

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Per-component checkpoint records kept as JSON files under a working directory.
///
/// The store does no locking: callers must not update the same component from
/// two places at once.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            root: work_dir.as_ref().join(CHECKPOINT_DIR),
        }
    }

    /// Location of the record for `component`.
    pub fn path_for(&self, component: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize(component)))
    }

    /// Load the record for `component`. A missing record is an empty one.
    pub fn load(&self, component: &str) -> Result<ComponentCheckpoint> {
        let path = self.path_for(component);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ComponentCheckpoint::empty(component));
            }
            Err(e) => return Err(e.into()),
        };

        let checkpoint: ComponentCheckpoint = serde_json::from_reader(BufReader::new(file))?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::InvalidVersion(checkpoint.version));
        }
        if checkpoint.component != component {
            return Err(CheckpointError::ComponentMismatch {
                expected: component.to_string(),
                found: checkpoint.component,
            });
        }
        Ok(checkpoint)
    }

    /// Load the record for `component`, treating any failure as "no progress yet".
    pub fn load_or_default(&self, component: &str) -> ComponentCheckpoint {
        match self.load(component) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(
                    component = %component,
                    path = %self.path_for(component).display(),
                    error = %e,
                    "Ignoring unreadable checkpoint, starting from no progress"
                );
                ComponentCheckpoint::empty(component)
            }
        }
    }

    pub fn last_processed_instant(&self, component: &str) -> DateTime<Utc> {
        self.load_or_default(component).last_processed
    }

    /// Record that the first `offset` bytes of `file` were delivered.
    ///
    /// Offsets never move backwards for the same physical file. Reaching the
    /// end of the file as it was scanned also advances the component's
    /// last-processed instant to the file's modification time, but never onto
    /// or past an older file that is still only partly delivered. Once that
    /// file is finished the instant catches up with the newer ones.
    pub fn record_progress(
        &self,
        component: &str,
        file: &LogFile,
        offset: u64,
    ) -> Result<ComponentCheckpoint> {
        if offset > file.size() {
            return Err(CheckpointError::OffsetBeyondEnd {
                identity: file.identity().clone(),
                offset,
                size: file.size(),
            });
        }

        let mut checkpoint = self.load_or_default(component);
        let current = checkpoint.resume_offset(file);
        let completes = offset == file.size() && file.last_modified() > checkpoint.last_processed;
        if offset < current || (offset == current && !completes) {
            tracing::debug!(
                component = %component,
                file = %file.name(),
                offset,
                current,
                "Checkpoint unchanged"
            );
            return Ok(checkpoint);
        }

        checkpoint.files.insert(
            file.identity().to_string(),
            FileCheckpoint {
                path: file.path().to_path_buf(),
                fingerprint: file.fingerprint().map(str::to_string),
                offset,
                size: file.size(),
                last_modified: file.last_modified(),
            },
        );

        if completes {
            let instant = checkpoint.delivered_through();
            if instant > checkpoint.last_processed {
                checkpoint.last_processed = instant;
            } else if let Some(pending) = checkpoint.oldest_pending() {
                tracing::debug!(
                    component = %component,
                    file = %file.name(),
                    pending = %pending,
                    "Holding back last processed instant for partly delivered file"
                );
            }
        }
        checkpoint.updated_at = Some(Utc::now());

        self.save(&checkpoint)?;
        tracing::debug!(
            component = %component,
            file = %file.name(),
            offset,
            "Checkpoint advanced"
        );
        Ok(checkpoint)
    }

    /// Drop per-file entries whose identity is no longer part of `group`.
    /// Returns the number of entries removed.
    pub fn forget_missing(&self, component: &str, group: &LogFileGroup) -> Result<usize> {
        let mut checkpoint = self.load(component)?;
        let live: HashSet<String> = group
            .all_files()
            .map(|f| f.identity().to_string())
            .collect();

        let before = checkpoint.files.len();
        checkpoint.files.retain(|key, _| live.contains(key));
        let removed = before - checkpoint.files.len();

        if removed > 0 {
            checkpoint.updated_at = Some(Utc::now());
            self.save(&checkpoint)?;
            tracing::debug!(component = %component, removed, "Pruned checkpoint entries");
        }
        Ok(removed)
    }

    /// Write `checkpoint` atomically (temp file + rename).
    pub fn save(&self, checkpoint: &ComponentCheckpoint) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(&checkpoint.component);
        let temp_path = path.with_extension(format!("json.tmp.{}", std::process::id()));

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, checkpoint)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

/// File-name-safe form of a component name. Bytes outside `[A-Za-z0-9._-]`
/// are written as `%XX`, so distinct names never share a record.
fn sanitize(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for byte in component.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
