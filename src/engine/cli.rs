//! CLI command handler: run the daemon by default; --list prints a stored index.

use anyhow::{Context, Result};
use log::debug;
use std::io::Write;
use std::path::Path;

use crate::Opts;
use crate::engine::Store;
use crate::engine::arg_parser::Cli;
use crate::pipeline::run_daemon;
use crate::utils::{apply_file_to_opts, load_potluck_toml, period_from_secs, setup_logging};

/// Defaults, then `.potluck.toml` in `config_dir`, then CLI flags.
pub fn build_opts(cli: &Cli, config_dir: &Path) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_potluck_toml(config_dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(ref dir) = cli.share {
        opts.share_root = dir.clone();
    }
    if let Some(ref dir) = cli.trigger {
        opts.trigger_dir = dir.clone();
    }
    if let Some(ref dir) = cli.output {
        opts.output_dir = dir.clone();
    }
    if let Some(ref db) = cli.db {
        opts.db_path = Some(db.clone());
    }
    if let Some(secs) = cli.period {
        opts.period = period_from_secs(secs);
    }
    if let Some(n) = cli.transferers {
        opts.transferers = n;
    }
    if !cli.exclude.is_empty() {
        opts.exclude = cli.exclude.clone();
    }
    if let Some(v) = cli.follow_links {
        opts.follow_links = v;
    }
    if let Some(v) = cli.strict {
        opts.strict = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts.list = cli.list;
    opts
}

/// Write every stored entry as one JSON object per line.
pub fn list_index(store: &Store, out: &mut impl Write) -> Result<usize> {
    let entries = store.list_all().context("list index")?;
    for entry in &entries {
        serde_json::to_writer(&mut *out, entry).context("encode entry")?;
        writeln!(out)?;
    }
    Ok(entries.len())
}

/// Run the daemon, or print the index when --list.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("read working directory")?;
    let opts = build_opts(cli, &cwd);
    setup_logging(opts.verbose);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    if opts.list {
        let db = opts
            .db_path
            .as_deref()
            .context("--list needs a file-backed store (--db PATH)")?;
        let store = Store::open(db).context("open content store")?;
        let stdout = std::io::stdout();
        list_index(&store, &mut stdout.lock())?;
        return Ok(());
    }

    run_daemon(&opts)
}
