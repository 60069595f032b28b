use crate::model::identity::FileIdentity;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Files smaller than this cannot hold a complete first record and are left
/// out of a group until they grow. It is also the length of the content
/// fingerprint.
pub const MIN_READABLE_FILE_SIZE: u64 = 1024;

#[derive(Debug, Error)]
pub enum FileAccessError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileAccessError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            FileAccessError::NotFound(path.to_path_buf())
        } else {
            FileAccessError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Snapshot of one log file taken during a directory scan.
///
/// Every value is captured when the file is opened; a later scan produces a
/// new `LogFile` rather than refreshing this one.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFile {
    path: PathBuf,
    name: String,
    size: u64,
    last_modified: DateTime<Utc>,
    identity: FileIdentity,
    fingerprint: Option<String>,
}

impl LogFile {
    /// Open `path` and capture its metadata and content fingerprint.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileAccessError> {
        let path = path.as_ref();
        // Stat before opening: opening a FIFO for reading blocks until a writer shows up.
        let metadata = fs::metadata(path).map_err(|e| FileAccessError::io(path, e))?;
        if !metadata.is_file() {
            return Err(FileAccessError::NotAFile(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| FileAccessError::io(path, e))?;

        let modified = metadata
            .modified()
            .map_err(|e| FileAccessError::io(path, e))?;

        let mut head = Vec::with_capacity(MIN_READABLE_FILE_SIZE as usize);
        file.take(MIN_READABLE_FILE_SIZE)
            .read_to_end(&mut head)
            .map_err(|e| FileAccessError::io(path, e))?;
        let head_digest = hex_digest(&head);

        let identity = FileIdentity::from_metadata(&metadata, &head_digest);
        let fingerprint = if head.len() as u64 == MIN_READABLE_FILE_SIZE {
            Some(head_digest)
        } else {
            None
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            last_modified: DateTime::<Utc>::from(modified),
            identity,
            fingerprint,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name at scan time.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Key under which checkpoint progress for this file is stored.
    pub fn identity(&self) -> &FileIdentity {
        &self.identity
    }

    /// Hex SHA-256 of the first [`MIN_READABLE_FILE_SIZE`] bytes, or `None`
    /// when the file was shorter than that.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Whether the file holds enough bytes to be considered for grouping.
    pub fn is_size_eligible(&self) -> bool {
        self.size >= MIN_READABLE_FILE_SIZE
    }

    /// Whether the name ends in a numeric rotation suffix such as `.3`, `_3`
    /// or `-3` (optionally followed by `.gz`).
    pub fn is_rotated_name(&self) -> bool {
        let name = self.name.strip_suffix(".gz").unwrap_or(&self.name);
        match name.rfind(['.', '_', '-']) {
            Some(idx) => {
                let suffix = &name[idx + 1..];
                !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
