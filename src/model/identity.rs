//! Rename-stable file identity.
//!
//! On Unix a file is identified by its device and inode numbers, which survive
//! the renames performed by log rotation. Platforms without a stable file
//! identifier fall back to a digest of the file's leading bytes combined with
//! its creation time.

use std::fmt;
use std::fs::Metadata;
use std::str::FromStr;

/// Identity of a physical file, independent of its current name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileIdentity {
    /// Device ID + inode number.
    Inode { dev: u64, ino: u64 },
    /// Digest of the leading bytes plus creation time, for platforms without inodes.
    Content(String),
}

impl FileIdentity {
    pub fn inode(dev: u64, ino: u64) -> Self {
        Self::Inode { dev, ino }
    }

    /// Derive the identity of an already opened file.
    ///
    /// `head_digest` is the hex SHA-256 of whatever leading bytes were read
    /// from the file; it is only consulted on platforms without inodes.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata, _head_digest: &str) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::Inode {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata, head_digest: &str) -> Self {
        // Files created within the same clock tick with identical heads collide.
        let created = metadata
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self::Content(format!("{}@{}", head_digest, created))
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileIdentity::Inode { dev, ino } => write!(f, "{}:{}", dev, ino),
            FileIdentity::Content(digest) => write!(f, "sha256:{}", digest),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid file identity '{0}'")]
pub struct ParseIdentityError(String);

impl FromStr for FileIdentity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digest) = s.strip_prefix("sha256:") {
            if digest.is_empty() {
                return Err(ParseIdentityError(s.to_string()));
            }
            return Ok(FileIdentity::Content(digest.to_string()));
        }

        let (dev, ino) = s
            .split_once(':')
            .ok_or_else(|| ParseIdentityError(s.to_string()))?;
        let dev = dev.parse().map_err(|_| ParseIdentityError(s.to_string()))?;
        let ino = ino.parse().map_err(|_| ParseIdentityError(s.to_string()))?;
        Ok(FileIdentity::Inode { dev, ino })
    }
}
