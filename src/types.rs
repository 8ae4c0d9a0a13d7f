//! Public and internal types for the potluck API and workers.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Length in bytes of a SHA-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Why a string could not be read as a [`Digest`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest is not valid hex: {0}")]
    InvalidHex(String),
    #[error("digest must be {DIGEST_LEN} bytes, got {0}")]
    WrongLength(usize),
}

/// SHA-256 of a file's full byte content. The content-addressing key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    /// Build from a byte slice (e.g. a BLOB column). Fails unless the slice is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DigestError> {
        let arr: [u8; DIGEST_LEN] = bytes
            .try_into()
            .map_err(|_| DigestError::WrongLength(bytes.len()))?;
        Ok(Digest(arr))
    }

    /// Parse lowercase or uppercase hex.
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let bytes = hex::decode(s).map_err(|_| DigestError::InvalidHex(s.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, the form used for trigger and output file names.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::from_hex(s)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// One row of the content table.
///
/// `path` is relative to the content root, stored with forward slashes. Timestamps are
/// nanoseconds since the Unix epoch as issued by [`Store::now`](crate::engine::Store::now).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentEntry {
    pub path: PathBuf,
    pub digest: Digest,
    /// Last time the digest was (re)computed.
    pub hash_timestamp_ns: i64,
    /// Last time the path was seen by an indexing pass.
    pub check_timestamp_ns: i64,
}

/// Ask a transferer to deliver the content with this digest. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub digest: Digest,
}

/// What one completed indexing pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Files hashed and upserted.
    pub files: usize,
    /// Files or directories that could not be read (non-strict mode only).
    pub skipped: usize,
    /// Stale rows removed by the sweep.
    pub evicted: usize,
    /// Rows in the store after the sweep.
    pub entries: usize,
    pub elapsed: Duration,
}

/// Signal sent by the indexer on the status channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexStatus {
    Updated(PassSummary),
}

/// Full daemon options (CLI, config file, lib).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Content root to index.
    pub share_root: PathBuf,
    /// Watched directory; a write to `<hex digest>` here requests that content.
    pub trigger_dir: PathBuf,
    /// Destination for transferred files, named `<hex digest><ext>`.
    pub output_dir: PathBuf,
    /// File-backed store. When None, the store lives in memory for the life of the process.
    pub db_path: Option<PathBuf>,
    /// Time between indexing passes. None runs a single pass.
    pub period: Option<Duration>,
    /// Number of transferer replicas sharing the request channel.
    pub transferers: usize,
    /// Exclude patterns (glob syntax) applied during the walk.
    pub exclude: Vec<String>,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Strict mode: any per-file or per-request failure stops the worker (and so the daemon).
    pub strict: bool,
    pub verbose: bool,
    /// Print the stored index as JSON lines and exit.
    pub list: bool,
}

impl Default for Opts {
    fn default() -> Self {
        use crate::utils::config::{DaemonDefaults, PackagePaths};
        let paths = PackagePaths::get();
        Opts {
            share_root: PathBuf::from("."),
            trigger_dir: PathBuf::from(paths.trigger_dir_name()),
            output_dir: PathBuf::from(paths.output_dir_name()),
            db_path: None,
            period: Some(Duration::from_secs(DaemonDefaults::PERIOD_SECS)),
            transferers: DaemonDefaults::TRANSFERERS,
            exclude: Vec::new(),
            follow_links: false,
            strict: false,
            verbose: false,
            list: false,
        }
    }
}
