//! Potluck daemon: index a directory, watch for requests, copy requested content out.

use anyhow::Result;
use clap::Parser;
use potluck::engine::{Cli, handle_run};
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    // RUST_LOG and friends may come from a local .env
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
