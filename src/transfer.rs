//! Transferer: resolves requested digests to files and copies them into the output directory.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, select};
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::tools::dotted_extension;
use crate::engine::{Store, StoreError};
use crate::pipeline::CancelToken;
use crate::utils::{CopyOutcome, copy_verified};
use crate::{Digest, TransferRequest};

#[derive(Debug, Error)]
pub enum TransferError {
    /// The request named content the store no longer has (e.g. evicted after the request was made).
    #[error("no indexed content with digest {0}")]
    UnknownDigest(Digest),
    #[error(transparent)]
    Store(StoreError),
    #[error("copy {} -> {}: {source}", src.display(), dest.display())]
    Copy {
        src: PathBuf,
        dest: PathBuf,
        source: std::io::Error,
    },
    /// The file at the indexed path changed since it was hashed; nothing was written.
    #[error("{} no longer has digest {expected} (now {actual})", path.display())]
    Stale {
        path: PathBuf,
        expected: Digest,
        actual: Digest,
    },
    #[error("transfer of {0} cancelled")]
    Cancelled(Digest),
}

impl From<StoreError> for TransferError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(digest) => TransferError::UnknownDigest(digest),
            other => TransferError::Store(other),
        }
    }
}

/// Copies requested content from the content root into `dir`.
#[derive(Clone, Debug)]
pub struct Transferer {
    source_root: PathBuf,
    dir: PathBuf,
    strict: bool,
}

impl Transferer {
    /// Transferer reading from `source_root` and writing into `dir` (created if needed).
    pub fn new(source_root: &Path, dir: &Path, strict: bool) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
        Ok(Transferer {
            source_root: source_root.to_path_buf(),
            dir: dir.to_path_buf(),
            strict,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination for content found at `source`: `<hex digest><source extension>`.
    pub fn destination_for(&self, digest: &Digest, source: &Path) -> PathBuf {
        self.dir
            .join(format!("{}{}", digest.to_hex(), dotted_extension(source)))
    }

    /// Fulfil one request. The destination is either absent or complete, never partial, and its
    /// bytes always hash to the requested digest.
    pub fn transfer(
        &self,
        store: &Store,
        request: &TransferRequest,
        cancel: &CancelToken,
    ) -> Result<PathBuf, TransferError> {
        let rel = store.path_for_digest(&request.digest)?;
        let src = self.source_root.join(&rel);
        let dest = self.destination_for(&request.digest, &rel);
        match copy_verified(&src, &dest, &request.digest, cancel) {
            Ok(CopyOutcome::Written(bytes)) => {
                info!("Transferred {} ({} bytes) -> {}", rel.display(), bytes, dest.display());
                Ok(dest)
            }
            Ok(CopyOutcome::Mismatch(actual)) => Err(TransferError::Stale {
                path: src,
                expected: request.digest,
                actual,
            }),
            Ok(CopyOutcome::Cancelled) => Err(TransferError::Cancelled(request.digest)),
            Err(source) => Err(TransferError::Copy { src, dest, source }),
        }
    }

    /// Serve requests until cancelled or the request channel closes.
    ///
    /// A failed request is logged and dropped; in strict mode it stops the worker instead.
    pub fn run(
        &self,
        store: &Store,
        requests: &Receiver<TransferRequest>,
        cancel: &CancelToken,
    ) -> Result<()> {
        loop {
            let request = select! {
                recv(cancel.done()) -> _ => return Ok(()),
                recv(requests) -> msg => match msg {
                    Ok(request) => request,
                    Err(_) => {
                        debug!("Request channel closed; transferer stopping");
                        return Ok(());
                    }
                },
            };
            match self.transfer(store, &request, cancel) {
                Ok(_) => {}
                Err(TransferError::Cancelled(_)) => return Ok(()),
                Err(TransferError::Store(err)) => {
                    return Err(err).context(format!("resolve {}", request.digest));
                }
                Err(err) if self.strict => {
                    return Err(anyhow::Error::new(err).context("strict mode"));
                }
                Err(err) => error!("Transfer failed: {}", err),
            }
        }
    }
}
