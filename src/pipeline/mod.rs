//! Worker wiring: cancellation, channels, the walk, supervision, and the daemon loop.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod walk;

pub use context::{
    CancelToken, FirstError, WorkerChannels, WorkerHandles, create_worker_channels,
};
pub use error_handler::{record_worker_result, take_first_error};
pub use orchestrator::{monitor_status, run_daemon, shutdown_workers, spawn_workers};
pub use walk::{WalkOutcome, to_outcome_walkdir, walk_files};
