//! Unit tests for digests, path helpers, walk filtering, config loading, and cancellation.

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use notify::EventKind;
use notify::event::{CreateKind, DataChange, ModifyKind, RenameMode};
use potluck::coordinate::{is_write_event, trigger_digest};
use potluck::engine::{
    Cli, Store, WalkFilter, build_opts, dotted_extension, glob_match, list_index,
    path_relative_to, path_to_db_string, should_include_in_walk,
};
use potluck::pipeline::CancelToken;
use potluck::utils::{apply_file_to_opts, is_transfer_temp_name, period_from_secs};
use potluck::utils::potluck_toml::parse_potluck_toml;
use potluck::{Digest, DigestError, Opts};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const HELLO_HASH: &str = "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3";

#[test]
fn test_digest_hex_parsing() {
    let d: Digest = HELLO_HASH.parse().unwrap();
    assert_eq!(d.to_hex(), HELLO_HASH);
    assert_eq!(d.to_string(), HELLO_HASH);
    assert_eq!(Digest::from_hex(&HELLO_HASH.to_uppercase()).unwrap(), d);
    assert!(matches!(
        Digest::from_hex("xyz"),
        Err(DigestError::InvalidHex(_))
    ));
    assert_eq!(Digest::from_hex("abcd"), Err(DigestError::WrongLength(2)));
    assert_eq!(Digest::from_slice(&[0u8; 31]), Err(DigestError::WrongLength(31)));
}

#[test]
fn test_glob_match() {
    assert!(glob_match("*.log", "debug.log"));
    assert!(!glob_match("*.log", "debug.txt"));
    assert!(glob_match("node_modules", "node_modules"));
    assert!(glob_match("a?c", "abc"));
    assert!(!glob_match("a?c", "ac"));
    assert!(glob_match("build/*", "build/out.o"));
    assert!(glob_match("*a*b", "xxaxxb"));
    assert!(glob_match("!*.tmp", "x.tmp"));
    assert!(glob_match("*", ""));
}

#[test]
fn test_path_helpers() {
    assert_eq!(
        path_relative_to(Path::new("/root/a/b.txt"), Path::new("/root")),
        Some(PathBuf::from("a/b.txt"))
    );
    assert_eq!(path_relative_to(Path::new("/elsewhere"), Path::new("/root")), None);
    assert_eq!(path_to_db_string(Path::new("a\\b\\c.txt")), "a/b/c.txt");
}

#[test]
fn test_dotted_extension() {
    assert_eq!(dotted_extension(Path::new("hello.txt")), ".txt");
    assert_eq!(dotted_extension(Path::new("dir/archive.tar.gz")), ".gz");
    assert_eq!(dotted_extension(Path::new("Makefile")), "");
    assert_eq!(dotted_extension(Path::new(".bashrc")), "");
}

#[test]
fn test_should_include_in_walk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let skipped = root.join("coordination");
    fs::create_dir_all(&skipped).unwrap();
    let filter = WalkFilter::new(
        root.clone(),
        &[skipped.as_path(), Path::new("/does/not/exist")],
        vec!["*.log".to_string(), "cache/*".to_string()],
    );
    assert_eq!(filter.skip, vec![skipped.clone()]);

    assert!(should_include_in_walk(&root, &filter));
    assert!(should_include_in_walk(&root.join("notes.txt"), &filter));
    assert!(!should_include_in_walk(&skipped, &filter));
    assert!(!should_include_in_walk(&root.join("debug.log"), &filter));
    assert!(!should_include_in_walk(&root.join("cache").join("x.bin"), &filter));
    assert!(!should_include_in_walk(&root.join("Thumbs.db"), &filter));
    assert!(!should_include_in_walk(&root.join("._resource"), &filter));
}

#[test]
fn test_trigger_digest_from_path() {
    let dir = Path::new("/tmp/coordination");
    assert_eq!(
        trigger_digest(&dir.join(HELLO_HASH)).map(|d| d.to_hex()),
        Some(HELLO_HASH.to_string())
    );
    assert!(trigger_digest(&dir.join("readme.txt")).is_none());
    assert!(trigger_digest(&dir.join(format!("{HELLO_HASH}.txt"))).is_none());
    assert!(trigger_digest(&dir.join("abcd")).is_none());
}

#[test]
fn test_only_data_writes_count_as_triggers() {
    assert!(is_write_event(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
    assert!(is_write_event(&EventKind::Modify(ModifyKind::Any)));
    assert!(!is_write_event(&EventKind::Create(CreateKind::File)));
    assert!(!is_write_event(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
    assert!(!is_write_event(&EventKind::Any));
}

#[test]
fn test_transfer_temp_names() {
    assert!(is_transfer_temp_name(".potluck-a1b2c3.tmp"));
    assert!(!is_transfer_temp_name(&format!("{HELLO_HASH}.txt")));
}

#[test]
fn test_cancel_token_broadcasts_to_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    assert_eq!(
        clone.done().recv_timeout(Duration::from_millis(20)),
        Err(RecvTimeoutError::Timeout)
    );

    token.cancel();
    token.cancel();
    assert!(clone.is_cancelled());
    assert_eq!(
        clone.done().recv_timeout(Duration::from_millis(20)),
        Err(RecvTimeoutError::Disconnected)
    );
}

#[test]
fn test_period_zero_means_single_pass() {
    assert_eq!(period_from_secs(0), None);
    assert_eq!(period_from_secs(3), Some(Duration::from_secs(3)));
}

#[test]
fn test_opts_defaults() {
    let opts = Opts::default();
    assert_eq!(opts.trigger_dir, PathBuf::from("coordination"));
    assert_eq!(opts.output_dir, PathBuf::from("transferred"));
    assert_eq!(opts.period, Some(Duration::from_secs(5)));
    assert_eq!(opts.transferers, 1);
    assert!(opts.db_path.is_none());
    assert!(!opts.strict);
}

#[test]
fn test_config_file_applies_only_present_fields() {
    let file = parse_potluck_toml(
        r#"
[settings]
share = "/srv/share"
period = 0
exclude = ["*.iso"]
strict = true
"#,
    )
    .unwrap();
    let mut opts = Opts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.share_root, PathBuf::from("/srv/share"));
    assert_eq!(opts.period, None);
    assert_eq!(opts.exclude, vec!["*.iso".to_string()]);
    assert!(opts.strict);
    assert_eq!(opts.trigger_dir, PathBuf::from("coordination"));
    assert_eq!(opts.transferers, 1);
}

#[test]
fn test_malformed_config_is_an_error() {
    assert!(parse_potluck_toml("[settings]\nperiod = \"soon\"\n").is_err());
}

#[test]
fn test_cli_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(".potluck.toml"),
        "[settings]\nperiod = 30\ntransferers = 4\noutput = \"from-file\"\n",
    )
    .unwrap();
    let cli = Cli::parse_from(["potluck", "-p", "0", "--strict", "-t", "triggers"]);
    let opts = build_opts(&cli, dir.path());
    assert_eq!(opts.period, None);
    assert_eq!(opts.transferers, 4);
    assert_eq!(opts.output_dir, PathBuf::from("from-file"));
    assert_eq!(opts.trigger_dir, PathBuf::from("triggers"));
    assert!(opts.strict);
}

#[test]
fn test_list_index_writes_json_lines() {
    let store = Store::open_in_memory().unwrap();
    let digest: Digest = HELLO_HASH.parse().unwrap();
    store.upsert(Path::new("hello.txt"), &digest).unwrap();
    store.upsert(Path::new("copy/hello.txt"), &digest).unwrap();

    let mut out = Vec::new();
    assert_eq!(list_index(&store, &mut out).unwrap(), 2);
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["path"], "copy/hello.txt");
    assert_eq!(lines[0]["digest"], HELLO_HASH);
    assert!(lines[1]["hash_timestamp_ns"].as_i64().unwrap() > 0);
}
