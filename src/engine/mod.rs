//! Engine module: store, hashing, path tools, and the CLI surface

pub mod arg_parser;
pub mod cli;
pub mod db_ops;
pub mod hashing;
pub mod tools;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::{build_opts, handle_run, list_index};
pub use db_ops::{Store, StoreError, StoreResult, open_db, open_db_in_memory};
pub use hashing::{hash_bytes, hash_file};
pub use tools::{
    WalkFilter, dotted_extension, glob_match, path_relative_to, path_to_db_string,
    should_include_in_walk,
};
