//! Depth-first walk of the content root, yielding regular files and walk errors.

use std::path::PathBuf;

use walkdir::WalkDir;

use crate::engine::tools::{WalkFilter, should_include_in_walk};

/// One result from a directory walk: a regular file to hash, or an error with optional path.
#[derive(Debug)]
pub enum WalkOutcome {
    File { path: PathBuf, size: u64 },
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`]. Directories and other non-files give `None`.
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> Option<WalkOutcome> {
    match r {
        Ok(entry) => {
            if !entry.file_type().is_file() {
                return None;
            }
            match entry.metadata() {
                Ok(meta) => Some(WalkOutcome::File {
                    size: meta.len(),
                    path: entry.into_path(),
                }),
                Err(err) => Some(WalkOutcome::Err {
                    msg: format!("{}", err),
                    path: Some(entry.into_path()),
                }),
            }
        }
        Err(err) => Some(WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        }),
    }
}

/// Walk `filter.root` depth-first, pruning excluded subtrees. Listing order is whatever the
/// filesystem returns.
pub fn walk_files(
    filter: &WalkFilter,
    follow_links: bool,
) -> impl Iterator<Item = WalkOutcome> + '_ {
    WalkDir::new(&filter.root)
        .follow_links(follow_links)
        .into_iter()
        .filter_entry(move |e| should_include_in_walk(e.path(), filter))
        .filter_map(to_outcome_walkdir)
}
