//! Database operations: schema, connection opening, and the shared content [`Store`].

mod connection;
mod store;

pub use connection::{open_db, open_db_in_memory};
pub use store::{Store, StoreError, StoreResult};

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Insert a path or refresh every column of its existing row.
pub(crate) const UPSERT_CONTENT_SQL: &str = r#"
INSERT INTO content (path, digest, hash_ts_ns, check_ts_ns) VALUES (?1, ?2, ?3, ?3)
ON CONFLICT(path) DO UPDATE SET
    digest = excluded.digest,
    hash_ts_ns = excluded.hash_ts_ns,
    check_ts_ns = excluded.check_ts_ns
"#;

/// Schema for the content table. Digests are not unique: duplicate files share one.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS content (
    path TEXT PRIMARY KEY NOT NULL,
    digest BLOB NOT NULL,
    hash_ts_ns INTEGER NOT NULL,
    check_ts_ns INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_content_digest ON content(digest, path);
CREATE INDEX IF NOT EXISTS idx_content_check ON content(check_ts_ns);
"#;
