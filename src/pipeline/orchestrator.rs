use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, select};
use log::{debug, info};
use std::sync::Arc;
use std::thread;

use crate::coordinate::Coordinator;
use crate::engine::Store;
use crate::index::Indexer;
use crate::transfer::Transferer;
use crate::{IndexStatus, Opts};

use super::context::{CancelToken, WorkerHandles, create_worker_channels};
use super::error_handler::{new_first_error, record_worker_result, take_first_error};

/// Set up and start every worker against one shared store.
///
/// Setup happens here, on the caller's thread: output and trigger directories are created, the
/// content root is opened and the trigger watch is established. Any failure is returned before a
/// single thread is spawned. Workers then run until `cancel` fires or one of them fails, which
/// raises `cancel` for the rest.
pub fn spawn_workers(
    store: Arc<Store>,
    opts: &Opts,
    cancel: &CancelToken,
) -> Result<WorkerHandles> {
    // Both directories must exist before the indexer resolves what to leave out of its walk.
    std::fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("create output directory {}", opts.output_dir.display()))?;
    let coordinator = Coordinator::watch(&opts.trigger_dir)?;
    let indexer = Indexer::new(opts)?;
    // Sources resolve against the same canonical root the indexer records paths under.
    let transferer = Transferer::new(indexer.root(), &opts.output_dir, opts.strict)?;

    let channels = create_worker_channels();
    let first_error = new_first_error();
    let mut handles = Vec::new();

    {
        let (store, cancel, first_error) =
            (Arc::clone(&store), cancel.clone(), Arc::clone(&first_error));
        let status_tx = channels.status_tx;
        let handle = thread::Builder::new()
            .name("indexer".to_string())
            .spawn(move || {
                let result = indexer.run(&store, &status_tx, &cancel);
                record_worker_result("indexer", result, &first_error, &cancel);
            })
            .context("spawn indexer")?;
        handles.push(("indexer".to_string(), handle));
    }

    {
        let (store, cancel, first_error) =
            (Arc::clone(&store), cancel.clone(), Arc::clone(&first_error));
        let request_tx = channels.request_tx.clone();
        let handle = thread::Builder::new()
            .name("coordinator".to_string())
            .spawn(move || {
                let result = coordinator.run(&store, &request_tx, &cancel);
                record_worker_result("coordinator", result, &first_error, &cancel);
            })
            .context("spawn coordinator")?;
        handles.push(("coordinator".to_string(), handle));
    }

    for i in 0..opts.transferers.max(1) {
        let name = format!("transferer-{i}");
        let (store, cancel, first_error) =
            (Arc::clone(&store), cancel.clone(), Arc::clone(&first_error));
        let request_rx = channels.request_rx.clone();
        let transferer = transferer.clone();
        let worker_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let result = transferer.run(&store, &request_rx, &cancel);
                record_worker_result(&worker_name, result, &first_error, &cancel);
            })
            .with_context(|| format!("spawn {name}"))?;
        handles.push((name, handle));
    }

    Ok(WorkerHandles {
        status_rx: channels.status_rx,
        request_tx: channels.request_tx,
        handles,
        first_error,
        cancel: cancel.clone(),
    })
}

/// Join every worker, then surface the first fatal error (if any).
pub fn shutdown_workers(workers: WorkerHandles) -> Result<()> {
    let WorkerHandles {
        status_rx,
        request_tx,
        handles,
        first_error,
        cancel,
    } = workers;
    cancel.cancel();
    drop(status_rx);
    drop(request_tx);
    for (name, handle) in handles {
        if handle.join().is_err() {
            log::error!("{} panicked", name);
        }
    }
    take_first_error(&first_error)
}

/// Log index changes as passes complete. Returns when cancellation fires.
pub fn monitor_status(
    store: &Store,
    status_rx: &Receiver<IndexStatus>,
    cancel: &CancelToken,
) -> Result<()> {
    let mut previous_count: Option<usize> = None;
    loop {
        let status = select! {
            recv(cancel.done()) -> _ => return Ok(()),
            recv(status_rx) -> msg => match msg {
                Ok(status) => status,
                Err(_) => {
                    // One-shot indexer finished; the other workers keep running.
                    let _ = cancel.done().recv();
                    return Ok(());
                }
            },
        };
        let IndexStatus::Updated(summary) = status;
        if previous_count == Some(summary.entries) {
            continue;
        }
        info!("{} files indexed", summary.entries);
        if log::log_enabled!(log::Level::Debug) {
            for entry in store.list_all().context("list index")? {
                debug!(
                    "{} {} {}",
                    entry.digest,
                    entry.hash_timestamp_ns,
                    entry.path.display()
                );
            }
        }
        previous_count = Some(summary.entries);
    }
}

/// Open the store, run every worker, and block until Ctrl+C or a fatal worker error.
pub fn run_daemon(opts: &Opts) -> Result<()> {
    let store = Arc::new(match &opts.db_path {
        Some(path) => Store::open(path).context("open content store")?,
        None => Store::open_in_memory().context("open content store")?,
    });

    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        info!("SIGINT received; performing graceful shutdown...");
        cancel_handler.cancel();
    })
    .context("set Ctrl+C handler")?;

    let workers = spawn_workers(Arc::clone(&store), opts, &cancel)?;
    let monitored = monitor_status(&store, &workers.status_rx, &cancel);
    if monitored.is_err() {
        cancel.cancel();
    }
    let joined = shutdown_workers(workers);
    monitored.and(joined)
}
