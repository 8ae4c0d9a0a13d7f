//! Path and filter utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Relative path as stored in the content table: forward slashes on every platform.
pub fn path_to_db_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Extension of `path` including the leading dot, or empty when there is none.
/// `archive.tar.gz` gives `.gz`; dotfiles such as `.bashrc` have no extension.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// OS-generated metadata files that never belong in the index.
pub fn is_os_hidden_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    matches!(
        name,
        ".DS_Store"
            | ".AppleDouble"
            | ".LSOverride"
            | "Thumbs.db"
            | "ehthumbs.db"
            | "Desktop.ini"
            | "$RECYCLE.BIN"
            | ".directory"
    ) || name.starts_with("._")
        || name.starts_with(".Trash-")
}

/// What the indexer walk must leave out. Paths in `skip` are canonical and prune whole subtrees.
#[derive(Clone, Debug, Default)]
pub struct WalkFilter {
    pub root: PathBuf,
    pub skip: Vec<PathBuf>,
    pub exclude: Vec<String>,
}

impl WalkFilter {
    /// Build for a canonical `root`. Skip paths that do not exist yet are dropped; the
    /// daemon creates its own directories before the first pass.
    pub fn new(root: PathBuf, skip: &[&Path], exclude: Vec<String>) -> Self {
        let skip = skip
            .iter()
            .filter_map(|p| p.canonicalize().ok())
            .collect();
        WalkFilter {
            root,
            skip,
            exclude,
        }
    }
}

/// Returns true if the path should be included in the walk (not excluded).
pub fn should_include_in_walk(path: &Path, filter: &WalkFilter) -> bool {
    if path == filter.root {
        return true;
    }
    if filter.skip.iter().any(|s| path == s.as_path()) {
        return false;
    }
    if is_os_hidden_file(path) {
        return false;
    }
    if filter.exclude.is_empty() {
        return true;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    let rel = path_relative_to(path, &filter.root)
        .map(|p| path_to_db_string(&p))
        .unwrap_or_default();
    !filter
        .exclude
        .iter()
        .any(|pattern| glob_match(pattern, name) || glob_match(pattern, &rel))
}

/// Simple glob pattern matching (`*` any run, `?` any one char). A leading `!` is ignored.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.strip_prefix('!').unwrap_or(pattern).chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0_usize, 0_usize);
    // Last `*` seen and the text position it was matched against, for backtracking.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(&c) if c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Canonicalize the content root and make sure it is a readable directory.
pub fn check_root_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let path = path
        .canonicalize()
        .with_context(|| format!("canonicalize content root {}", path.display()))?;
    if !path.is_dir() {
        anyhow::bail!("content root is not a directory: {}", path.display());
    }
    std::fs::read_dir(&path)
        .with_context(|| format!("open content root {}", path.display()))?;
    Ok(path)
}

/// SQLite side files that sit next to a file-backed store.
pub fn db_side_files(db_path: &Path) -> [PathBuf; 3] {
    let name = db_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = db_path.parent().unwrap_or(Path::new("."));
    [
        db_path.to_path_buf(),
        parent.join(format!("{name}-wal")),
        parent.join(format!("{name}-shm")),
    ]
}
