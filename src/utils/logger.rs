use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERROR".red(),
        Level::Warn => "WARN".yellow(),
        Level::Info => "INFO".green(),
        Level::Debug => "DEBUG".blue(),
        Level::Trace => "TRACE".dimmed(),
    }
}

/// Initialise env_logger for the daemon: potluck at Info (Debug when verbose), dependencies at
/// Warn, `RUST_LOG` on top. Each line carries the worker thread that logged it. Later calls are
/// no-ops.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let current = std::thread::current();
            let worker = current.name().unwrap_or("main");
            let prefix = format!("[{} {}]", worker.cyan(), level_tag(record.level()));
            match record.level() {
                Level::Error | Level::Warn => writeln!(
                    buf,
                    "{} {} {}",
                    prefix,
                    record.target().white(),
                    record.args()
                ),
                Level::Info => writeln!(buf, "{} {}", prefix, record.args()),
                Level::Debug | Level::Trace => {
                    writeln!(buf, "{} {}", prefix, record.args().to_string().dimmed())
                }
            }
        })
        .try_init();
}
