//! Coordinator: turns writes in the trigger directory into transfer requests for known content.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use log::{debug, info, warn};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

use crate::engine::Store;
use crate::pipeline::CancelToken;
use crate::utils::config::CoordinatorConsts;
use crate::{Digest, TransferRequest};

/// An established watch on the trigger directory.
///
/// Built with [`Coordinator::watch`] before any worker thread starts, so a directory that cannot
/// be watched is a startup error rather than a dead worker.
pub struct Coordinator {
    dir: PathBuf,
    // Kept alive for the lifetime of the watch; dropping it stops delivery.
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
}

/// True for notifications that mean "content was written" (not create, rename, or metadata-only).
pub fn is_write_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}

/// Candidate digest named by a trigger path: its base file name, which must be hex.
pub fn trigger_digest(path: &Path) -> Option<Digest> {
    let name = path.file_name()?.to_str()?;
    Digest::from_hex(name).ok()
}

/// Map one notification to a request, if it is a write naming content the store has.
pub fn request_for_event(event: &Event, store: &Store) -> Option<TransferRequest> {
    if !is_write_event(&event.kind) {
        return None;
    }
    event
        .paths
        .iter()
        .filter_map(|p| trigger_digest(p))
        .find(|digest| store.have(digest))
        .map(|digest| TransferRequest { digest })
}

impl Coordinator {
    /// Watch `dir` (non-recursive), creating it if needed. At most
    /// [`CoordinatorConsts::EVENT_BUFFER`] notifications wait while a request is pending.
    pub fn watch(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create trigger directory {}", dir.display()))?;
        let (tx, rx) = bounded::<notify::Result<Event>>(CoordinatorConsts::EVENT_BUFFER);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The watcher thread never blocks.
            if let Err(TrySendError::Full(_)) = tx.try_send(res) {
                debug!("Trigger backlog full; dropping notification");
            }
        })
        .context("create file watcher")?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watch trigger directory {}", dir.display()))?;
        info!("Watching {} for transfer triggers", dir.display());
        Ok(Coordinator {
            dir: dir.to_path_buf(),
            _watcher: watcher,
            events: rx,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Event loop. Watch errors are logged and skipped. The request send is a rendezvous with a
    /// transferer and is abandoned if cancellation fires while waiting.
    pub fn run(
        &self,
        store: &Store,
        requests: &Sender<TransferRequest>,
        cancel: &CancelToken,
    ) -> Result<()> {
        loop {
            let event = select! {
                recv(cancel.done()) -> _ => return Ok(()),
                recv(self.events) -> msg => match msg {
                    Ok(Ok(event)) => event,
                    Ok(Err(err)) => {
                        warn!("Watch error: {}", err);
                        continue;
                    }
                    Err(_) => anyhow::bail!("watcher for {} shut down", self.dir.display()),
                },
            };
            debug!("event: {:?}", event);

            let Some(request) = request_for_event(&event, store) else {
                continue;
            };
            debug!("Requesting transfer of {}", request.digest);
            select! {
                send(requests, request) -> res => {
                    if res.is_err() {
                        debug!("No transferers listening; coordinator stopping");
                        return Ok(());
                    }
                }
                recv(cancel.done()) -> _ => return Ok(()),
            }
        }
    }
}
