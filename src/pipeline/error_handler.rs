use anyhow::{Error, Result};
use std::sync::Arc;

use super::context::{CancelToken, FirstError};

/// Supervisor policy for a finished worker.
///
/// Workers only return `Err` for setup, store, or strict-mode failures; any of those halts the
/// daemon. The first error is kept for the caller and cancellation is raised for everyone else.
pub fn record_worker_result(
    name: &str,
    result: Result<()>,
    first_error: &FirstError,
    cancel: &CancelToken,
) {
    match result {
        Ok(()) => log::debug!("{} stopped", name),
        Err(err) => {
            log::error!("{} failed: {:#}", name, err);
            let mut slot = first_error.lock().unwrap_or_else(|e| e.into_inner());
            slot.get_or_insert(err.context(format!("{name} worker")));
            drop(slot);
            cancel.cancel();
        }
    }
}

/// Take the recorded error (if any). Call after joining every worker.
pub fn take_first_error(first_error: &FirstError) -> Result<()> {
    let taken: Option<Error> = first_error
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take();
    match taken {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub fn new_first_error() -> FirstError {
    Arc::new(std::sync::Mutex::new(None))
}
