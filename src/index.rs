//! Indexer: keeps the store mirroring the content root, one pass per tick.

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, select, tick};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::engine::Store;
use crate::engine::hashing::hash_file;
use crate::engine::tools::{
    WalkFilter, check_root_and_canonicalize, db_side_files, path_relative_to,
};
use crate::pipeline::{CancelToken, WalkOutcome, walk_files};
use crate::{IndexStatus, Opts, PassSummary};

/// How a pass ended.
#[derive(Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassSummary),
    /// Cancellation fired mid-walk. No sweep ran and no status was sent.
    Cancelled,
}

/// Walks one content root into a [`Store`].
#[derive(Clone, Debug)]
pub struct Indexer {
    root: PathBuf,
    filter: WalkFilter,
    period: Option<Duration>,
    follow_links: bool,
    strict: bool,
}

impl Indexer {
    /// Indexer for `opts.share_root`. The store file and the trigger/output directories are left
    /// out of the walk when they sit inside the root. Fails if the root cannot be opened.
    pub fn new(opts: &Opts) -> Result<Self> {
        let root = check_root_and_canonicalize(&opts.share_root)?;
        let mut skip: Vec<PathBuf> = vec![opts.trigger_dir.clone(), opts.output_dir.clone()];
        if let Some(db) = &opts.db_path {
            skip.extend(db_side_files(db));
        }
        let skip_refs: Vec<&Path> = skip.iter().map(PathBuf::as_path).collect();
        Ok(Indexer {
            filter: WalkFilter::new(root.clone(), &skip_refs, opts.exclude.clone()),
            root,
            period: opts.period,
            follow_links: opts.follow_links,
            strict: opts.strict,
        })
    }

    /// Single-pass indexer over `root` with default settings.
    pub fn one_shot(root: &Path) -> Result<Self> {
        let opts = Opts {
            share_root: root.to_path_buf(),
            period: None,
            ..Opts::default()
        };
        Self::new(&opts)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run passes until cancelled (or once, without a period). Sends one status per completed pass.
    pub fn run(
        &self,
        store: &Store,
        status: &Sender<IndexStatus>,
        cancel: &CancelToken,
    ) -> Result<()> {
        if !self.pass_and_report(store, status, cancel, "Initial")? {
            return Ok(());
        }
        let Some(period) = self.period else {
            return Ok(());
        };

        let ticker = tick(period);
        loop {
            select! {
                recv(cancel.done()) -> _ => return Ok(()),
                recv(ticker) -> _ => {
                    if !self.pass_and_report(store, status, cancel, "Subsequent")? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// One pass plus its status. Returns false when the worker should stop.
    fn pass_and_report(
        &self,
        store: &Store,
        status: &Sender<IndexStatus>,
        cancel: &CancelToken,
        label: &str,
    ) -> Result<bool> {
        let summary = match self.run_pass(store, cancel)? {
            PassOutcome::Completed(summary) => summary,
            PassOutcome::Cancelled => {
                debug!("Index pass cancelled");
                return Ok(false);
            }
        };
        info!(
            "{} index took {:?} ({} files, {} evicted, {} skipped)",
            label, summary.elapsed, summary.files, summary.evicted, summary.skipped
        );
        select! {
            send(status, IndexStatus::Updated(summary)) -> res => {
                if res.is_err() {
                    debug!("Index status has no listener");
                }
                Ok(true)
            }
            recv(cancel.done()) -> _ => Ok(false),
        }
    }

    /// Walk the tree, upsert every regular file, then evict rows not touched by this walk.
    ///
    /// The cutoff is taken from the store clock before the walk starts, so rows written during
    /// this pass are never older than it, whatever order the walk visits them in.
    pub fn run_pass(&self, store: &Store, cancel: &CancelToken) -> Result<PassOutcome> {
        let started = Instant::now();
        let pass_start = store.now().context("read store clock")?;
        let mut summary = PassSummary::default();

        for outcome in walk_files(&self.filter, self.follow_links) {
            if cancel.is_cancelled() {
                return Ok(PassOutcome::Cancelled);
            }
            match outcome {
                WalkOutcome::File { path, size } => match hash_file(&path, size, Some(cancel)) {
                    Ok(Some(digest)) => {
                        let rel = path_relative_to(&path, &self.root).unwrap_or_else(|| path.clone());
                        store
                            .upsert(&rel, &digest)
                            .with_context(|| format!("upsert {}", rel.display()))?;
                        summary.files += 1;
                    }
                    Ok(None) => return Ok(PassOutcome::Cancelled),
                    Err(err) => {
                        self.skip_or_fail(&mut summary, format!("hash {}: {:#}", path.display(), err))?
                    }
                },
                WalkOutcome::Err { msg, path } => {
                    let at = path
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<no path>".to_string());
                    self.skip_or_fail(&mut summary, format!("walk {}: {}", at, msg))?
                }
            }
        }

        summary.evicted = store
            .delete_stale_before(pass_start)
            .context("remove stale entries")?;
        summary.entries = store.count().context("count entries")?;
        summary.elapsed = started.elapsed();
        Ok(PassOutcome::Completed(summary))
    }

    /// Strict mode fails the pass; otherwise the path is skipped (and so evicted by the sweep).
    fn skip_or_fail(&self, summary: &mut PassSummary, msg: String) -> Result<()> {
        if self.strict {
            anyhow::bail!("strict mode: {}", msg);
        }
        warn!("Skipping unreadable path: {}", msg);
        summary.skipped += 1;
        Ok(())
    }
}
