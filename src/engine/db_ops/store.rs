//! The content store: path → (digest, hash time, check time), shared by every worker.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::engine::tools::path_to_db_string;
use crate::{ContentEntry, Digest, DigestError};

use super::{UPSERT_CONTENT_SQL, open_db, open_db_in_memory};

#[derive(Debug, Error)]
pub enum StoreError {
    /// No row currently has this digest.
    #[error("no content with digest {0}")]
    NotFound(Digest),
    #[error(transparent)]
    InvalidDigest(#[from] DigestError),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store lock poisoned by a panicking worker")]
    Poisoned,
    #[error("open store: {0:#}")]
    Open(anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

struct Inner {
    conn: Connection,
    /// Last timestamp handed out; stamps keep increasing even if the wall clock steps back.
    last_ns: i64,
}

/// Thread-safe content store.
///
/// One SQLite connection behind a `Mutex`: every method is a single locked statement, so an
/// upsert and a stale sweep never interleave. Share it between workers with `Arc<Store>`.
pub struct Store {
    inner: Mutex<Inner>,
}

fn wall_clock_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Raw row: (path, digest, hash_ts_ns, check_ts_ns).
type ContentRow = (String, Vec<u8>, i64, i64);

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn build_entry((path, digest, hash_ts, check_ts): ContentRow) -> StoreResult<ContentEntry> {
    Ok(ContentEntry {
        path: PathBuf::from(path),
        digest: Digest::from_slice(&digest)?,
        hash_timestamp_ns: hash_ts,
        check_timestamp_ns: check_ts,
    })
}

impl Store {
    /// Open (or create) a file-backed store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = open_db(path).map_err(StoreError::Open)?;
        Self::from_connection(conn)
    }

    /// Open an empty store that lives as long as the process.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(StoreError::Open)?;
        Self::from_connection(conn)
    }

    /// The clock resumes after the newest stored stamp, so a reopened store never issues a pass
    /// start older than rows written by an earlier run, even if the wall clock went back.
    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let last_ns: Option<i64> =
            conn.query_row("SELECT MAX(check_ts_ns) FROM content", [], |row| row.get(0))?;
        Ok(Store {
            inner: Mutex::new(Inner {
                conn,
                last_ns: last_ns.unwrap_or(0),
            }),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    fn stamp(inner: &mut Inner) -> i64 {
        inner.last_ns = wall_clock_ns().max(inner.last_ns + 1);
        inner.last_ns
    }

    /// Current store time in nanoseconds. Strictly greater than every stamp issued before it, so
    /// a pass start taken here is later than every row written before it and earlier than every
    /// row written after it.
    pub fn now(&self) -> StoreResult<i64> {
        let mut inner = self.lock()?;
        Ok(Self::stamp(&mut inner))
    }

    /// Insert `path` or replace its row, setting both timestamps to now.
    pub fn upsert(&self, path: &Path, digest: &Digest) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let now = Self::stamp(&mut inner);
        inner.conn.execute(
            UPSERT_CONTENT_SQL,
            params![path_to_db_string(path), digest.as_bytes().as_slice(), now],
        )?;
        Ok(())
    }

    /// Number of tracked paths.
    pub fn count(&self) -> StoreResult<usize> {
        let inner = self.lock()?;
        let n: i64 = inner
            .conn
            .query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }

    /// One path whose current content has `digest`. When several paths share it, the
    /// lexicographically smallest path wins.
    pub fn path_for_digest(&self, digest: &Digest) -> StoreResult<PathBuf> {
        let inner = self.lock()?;
        let path: Option<String> = inner
            .conn
            .query_row(
                "SELECT path FROM content WHERE digest = ?1 ORDER BY path LIMIT 1",
                [digest.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        path.map(PathBuf::from)
            .ok_or(StoreError::NotFound(*digest))
    }

    /// [`Self::path_for_digest`] for a hex-encoded digest.
    pub fn path_for_hex(&self, hex: &str) -> StoreResult<PathBuf> {
        self.path_for_digest(&Digest::from_hex(hex)?)
    }

    /// True iff at least one path currently has `digest`. Storage errors read as false.
    pub fn have(&self, digest: &Digest) -> bool {
        let Ok(inner) = self.lock() else {
            return false;
        };
        inner
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM content WHERE digest = ?1)",
                [digest.as_bytes().as_slice()],
                |row| row.get::<_, bool>(0),
            )
            .unwrap_or_else(|e| {
                log::warn!("digest lookup failed: {}", e);
                false
            })
    }

    /// [`Self::have`] for a hex-encoded digest. Malformed hex is simply not present.
    pub fn have_hex(&self, hex: &str) -> bool {
        match Digest::from_hex(hex) {
            Ok(digest) => self.have(&digest),
            Err(e) => {
                log::debug!("{}", e);
                false
            }
        }
    }

    /// Row for one path, if tracked.
    pub fn entry(&self, path: &Path) -> StoreResult<Option<ContentEntry>> {
        let inner = self.lock()?;
        let row = inner
            .conn
            .query_row(
                "SELECT path, digest, hash_ts_ns, check_ts_ns FROM content WHERE path = ?1",
                [path_to_db_string(path)],
                row_to_entry,
            )
            .optional()?;
        row.map(build_entry).transpose()
    }

    /// Every row, ordered by digest then path. For enumeration, not hot paths.
    pub fn list_all(&self) -> StoreResult<Vec<ContentEntry>> {
        let inner = self.lock()?;
        let mut stmt = inner.conn.prepare(
            "SELECT path, digest, hash_ts_ns, check_ts_ns FROM content ORDER BY digest, path",
        )?;
        let rows = stmt.query_map([], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(build_entry(row?)?);
        }
        Ok(entries)
    }

    /// Delete every row whose check time is strictly earlier than `cutoff_ns`. Returns rows removed.
    pub fn delete_stale_before(&self, cutoff_ns: i64) -> StoreResult<usize> {
        let inner = self.lock()?;
        let n = inner
            .conn
            .execute("DELETE FROM content WHERE check_ts_ns < ?1", [cutoff_ns])?;
        Ok(n)
    }
}
