//! Potluck: content-addressed indexing of a file tree, with on-demand delivery by digest.
//!
//! Three kinds of worker share one [`Store`](engine::Store):
//! the [`Indexer`](index::Indexer) mirrors a directory tree into it, the
//! [`Coordinator`](coordinate::Coordinator) turns trigger-file writes into transfer requests,
//! and [`Transferer`](transfer::Transferer)s copy the requested content out.

pub mod coordinate;
pub mod engine;
pub mod index;
pub mod pipeline;
pub mod transfer;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use std::path::Path;

use engine::Store;
use index::{Indexer, PassOutcome};
use pipeline::CancelToken;

/// Result alias used by public potluck API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Run one indexing pass of `root` into `store` and return what it did.
///
/// Unreadable files are skipped (and evicted), as in the daemon's default mode.
pub fn index_dir(root: &Path, store: &Store) -> Result<PassSummary> {
    let indexer = Indexer::one_shot(root)?;
    match indexer.run_pass(store, &CancelToken::new())? {
        PassOutcome::Completed(summary) => Ok(summary),
        PassOutcome::Cancelled => Err(anyhow::anyhow!("index pass cancelled")),
    }
}
