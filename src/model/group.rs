use crate::checkpoint::{ComponentCheckpoint, CheckpointStore};
use crate::model::component::ComponentLogConfiguration;
use crate::model::identity::FileIdentity;
use crate::model::log_file::LogFile;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvalidLogGroupError {
    #[error("log directory '{0}' does not exist")]
    DirectoryNotFound(PathBuf),

    #[error("log path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read log directory '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One component's log files at a single scan, split against a checkpoint.
///
/// A group is never updated in place; rescanning means calling
/// [`LogFileGroup::create`] again.
#[derive(Debug, Clone)]
pub struct LogFileGroup {
    component_name: String,
    last_processed: DateTime<Utc>,
    log_files: Vec<LogFile>,
    processed_log_files: Vec<LogFile>,
    active_file_identity: Option<FileIdentity>,
    checkpoint: ComponentCheckpoint,
}

impl LogFileGroup {
    /// Scan the component's directory and partition its files around
    /// `last_processed`. Per-file resume offsets are read from the checkpoint
    /// store under `work_dir`.
    pub fn create(
        config: &ComponentLogConfiguration,
        last_processed: DateTime<Utc>,
        work_dir: &Path,
    ) -> Result<Self, InvalidLogGroupError> {
        let checkpoint = CheckpointStore::new(work_dir).load_or_default(config.component_name());
        let files = scan_directory(config)?;
        Ok(Self::from_files(
            config.component_name(),
            files,
            last_processed,
            checkpoint,
        ))
    }

    /// Like [`LogFileGroup::create`], taking the last-processed instant from
    /// the checkpoint store as well.
    pub fn create_from_checkpoint(
        config: &ComponentLogConfiguration,
        work_dir: &Path,
    ) -> Result<Self, InvalidLogGroupError> {
        let checkpoint = CheckpointStore::new(work_dir).load_or_default(config.component_name());
        let last_processed = checkpoint.last_processed;
        let files = scan_directory(config)?;
        Ok(Self::from_files(
            config.component_name(),
            files,
            last_processed,
            checkpoint,
        ))
    }

    /// Build a group from already opened files. Files below the readable size
    /// threshold are dropped here.
    pub fn from_files(
        component_name: &str,
        files: Vec<LogFile>,
        last_processed: DateTime<Utc>,
        checkpoint: ComponentCheckpoint,
    ) -> Self {
        let eligible: Vec<LogFile> = files
            .into_iter()
            .filter(|f| {
                if f.is_size_eligible() {
                    true
                } else {
                    tracing::debug!(
                        component = %component_name,
                        file = %f.name(),
                        size = f.size(),
                        "Skipping log file below minimum readable size"
                    );
                    false
                }
            })
            .collect();

        let active_file_identity = select_active(&eligible).map(|f| f.identity().clone());

        let (mut processed_log_files, mut log_files): (Vec<_>, Vec<_>) = eligible
            .into_iter()
            .partition(|f| f.last_modified() <= last_processed);
        sort_chronologically(&mut processed_log_files);
        sort_chronologically(&mut log_files);

        Self {
            component_name: component_name.to_string(),
            last_processed,
            log_files,
            processed_log_files,
            active_file_identity,
            checkpoint,
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn last_processed(&self) -> DateTime<Utc> {
        self.last_processed
    }

    /// Files not yet fully delivered, oldest first.
    pub fn unprocessed_files(&self) -> &[LogFile] {
        &self.log_files
    }

    /// Files already delivered, oldest first.
    pub fn processed_files(&self) -> &[LogFile] {
        &self.processed_log_files
    }

    /// Every file in the group, processed ones first, each half oldest first.
    pub fn all_files(&self) -> impl Iterator<Item = &LogFile> {
        self.processed_log_files.iter().chain(self.log_files.iter())
    }

    pub fn len(&self) -> usize {
        self.log_files.len() + self.processed_log_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_active_file(&self, file: &LogFile) -> bool {
        self.active_file_identity.as_ref() == Some(file.identity())
    }

    pub fn active_file_identity(&self) -> Option<&FileIdentity> {
        self.active_file_identity.as_ref()
    }

    pub fn active_file(&self) -> Option<&LogFile> {
        let identity = self.active_file_identity.as_ref()?;
        self.get_file(identity)
    }

    pub fn get_file(&self, identity: &FileIdentity) -> Option<&LogFile> {
        self.all_files().find(|f| f.identity() == identity)
    }

    /// Byte offset a reader should start `file` from.
    pub fn start_offset(&self, file: &LogFile) -> u64 {
        self.checkpoint.resume_offset(file)
    }

    /// Bytes left to deliver across the unprocessed files.
    pub fn pending_bytes(&self) -> u64 {
        self.log_files
            .iter()
            .map(|f| f.size().saturating_sub(self.start_offset(f)))
            .sum()
    }

    /// Processed rotated files, oldest first. The active file is never
    /// included, even when it has been fully delivered.
    pub fn deletable_files(&self) -> Vec<&LogFile> {
        self.processed_log_files
            .iter()
            .filter(|f| !self.is_active_file(f))
            .collect()
    }
}

fn scan_directory(config: &ComponentLogConfiguration) -> Result<Vec<LogFile>, InvalidLogGroupError> {
    let dir = config.directory_path();
    let metadata = fs::metadata(dir).map_err(|e| directory_error(dir, e))?;
    if !metadata.is_dir() {
        return Err(InvalidLogGroupError::NotADirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|e| directory_error(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| directory_error(dir, e))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 file name");
            continue;
        };
        if !config.matches(name) {
            continue;
        }

        match LogFile::open(entry.path()) {
            Ok(file) => files.push(file),
            Err(e) => {
                tracing::debug!(
                    component = %config.component_name(),
                    error = %e,
                    "Dropping log file that could not be opened"
                );
            }
        }
    }

    tracing::debug!(
        component = %config.component_name(),
        directory = %dir.display(),
        matched = files.len(),
        "Scanned log directory"
    );
    Ok(files)
}

fn directory_error(dir: &Path, source: io::Error) -> InvalidLogGroupError {
    if source.kind() == io::ErrorKind::NotFound {
        InvalidLogGroupError::DirectoryNotFound(dir.to_path_buf())
    } else {
        InvalidLogGroupError::Unreadable {
            path: dir.to_path_buf(),
            source,
        }
    }
}

/// The most recently modified file. Equal timestamps prefer a name without a
/// rotation suffix, then the lexicographically greater name.
fn select_active(files: &[LogFile]) -> Option<&LogFile> {
    files
        .iter()
        .max_by(|a, b| active_key(a).cmp(&active_key(b)))
}

fn active_key(file: &LogFile) -> (DateTime<Utc>, bool, &str) {
    (file.last_modified(), !file.is_rotated_name(), file.name())
}

fn sort_chronologically(files: &mut [LogFile]) {
    files.sort_by(|a, b| {
        a.last_modified()
            .cmp(&b.last_modified())
            .then_with(|| a.name().cmp(b.name()))
    });
}
