//! Load `.potluck.toml` from a directory (CLI only). Lib callers build [`Opts`] themselves.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct PotluckToml {
    #[serde(default)]
    settings: Settings,
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    share: Option<String>,
    trigger: Option<String>,
    output: Option<String>,
    db_path: Option<String>,
    /// Seconds; 0 means a single pass.
    period: Option<u64>,
    transferers: Option<usize>,
    exclude: Option<Vec<String>>,
    follow_links: Option<bool>,
    strict: Option<bool>,
    verbose: Option<bool>,
}

/// Parse config text. Errors are returned so the caller can decide how loudly to complain.
pub fn parse_potluck_toml(s: &str) -> Result<PotluckToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load `.potluck.toml` from `dir` if present. Returns None if missing, unreadable, or malformed.
pub fn load_potluck_toml(dir: &Path) -> Option<PotluckToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_potluck_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($set:expr, $opts:expr, $set_field:ident => $opts_field:ident) => {
        if let Some(v) = $set.$set_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &PotluckToml, opts: &mut Opts) {
    let set = &file.settings;
    if let Some(ref p) = set.share {
        opts.share_root = PathBuf::from(p);
    }
    if let Some(ref p) = set.trigger {
        opts.trigger_dir = PathBuf::from(p);
    }
    if let Some(ref p) = set.output {
        opts.output_dir = PathBuf::from(p);
    }
    if let Some(ref p) = set.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    if let Some(secs) = set.period {
        opts.period = period_from_secs(secs);
    }
    apply_file_opt!(set, opts, transferers => transferers);
    if let Some(ref v) = set.exclude {
        opts.exclude = v.clone();
    }
    apply_file_opt!(set, opts, follow_links => follow_links);
    apply_file_opt!(set, opts, strict => strict);
    apply_file_opt!(set, opts, verbose => verbose);
}

/// `0` selects one-shot indexing.
pub fn period_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
