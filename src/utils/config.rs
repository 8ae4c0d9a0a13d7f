//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    temp_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                temp_prefix: format!(".{pkg}-"),
            }
        })
    }

    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Prefix for in-flight transfer temp files in the output directory.
    pub fn temp_prefix(&self) -> &str {
        &self.temp_prefix
    }

    pub fn trigger_dir_name(&self) -> &'static str {
        "coordination"
    }

    pub fn output_dir_name(&self) -> &'static str {
        "transferred"
    }
}

// ---- Daemon ----

pub struct DaemonDefaults;

impl DaemonDefaults {
    /// Seconds between indexing passes.
    pub const PERIOD_SECS: u64 = 5;
    pub const TRANSFERERS: usize = 1;
}

// ---- Coordinator ----

pub struct CoordinatorConsts;

impl CoordinatorConsts {
    /// Watch notifications held while the coordinator waits on a transferer. Further
    /// notifications are dropped until it catches up.
    pub const EVENT_BUFFER: usize = 64;
}

// ---- Hashing / copying ----

/// Hashing and copy I/O buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// Largest read chunk when hashing (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
    /// Chunk size for transfer copies; cancellation is checked between chunks.
    pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;
}
