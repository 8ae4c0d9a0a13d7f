//! Worker context: the shared cancellation token, the two channels, and the handles returned to
//! whoever launched the workers.

use anyhow::Error;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::{IndexStatus, TransferRequest};

/// Broadcast cancellation shared by every worker.
///
/// `cancel()` sets a flag for polling loops and drops the only sender of an internal channel, so
/// every clone's [`done`](Self::done) receiver becomes ready at once. Put `done()` in a
/// `select!` next to whatever the worker is blocked on.
#[derive(Clone, Debug)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    done: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            trigger: Arc::new(Mutex::new(Some(tx))),
            done: rx,
        }
    }

    /// Raise cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // A poisoned lock still holds the sender; take it either way.
        let mut guard = self.trigger.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Never yields a message; becomes ready (disconnected) once cancelled.
    pub fn done(&self) -> &Receiver<()> {
        &self.done
    }
}

/// First fatal worker error, shared by all workers of one daemon.
pub type FirstError = Arc<Mutex<Option<Error>>>;

/// Channels between workers. Requests use a zero-capacity (rendezvous) channel: a send only
/// completes when a transferer takes it, so pending requests never queue up.
pub struct WorkerChannels {
    pub status_tx: Sender<IndexStatus>,
    pub status_rx: Receiver<IndexStatus>,
    pub request_tx: Sender<TransferRequest>,
    pub request_rx: Receiver<TransferRequest>,
}

pub fn create_worker_channels() -> WorkerChannels {
    let (status_tx, status_rx) = bounded::<IndexStatus>(0);
    let (request_tx, request_rx) = bounded::<TransferRequest>(0);
    WorkerChannels {
        status_tx,
        status_rx,
        request_tx,
        request_rx,
    }
}

/// Returned by [`spawn_workers`](crate::pipeline::spawn_workers).
///
/// `status_rx` must be drained: the indexer blocks on each status until it is received.
/// `request_tx` lets an external intake (HTTP endpoint, tests) enqueue transfer requests.
pub struct WorkerHandles {
    pub status_rx: Receiver<IndexStatus>,
    pub request_tx: Sender<TransferRequest>,
    pub handles: Vec<(String, JoinHandle<()>)>,
    pub first_error: FirstError,
    pub cancel: CancelToken,
}
