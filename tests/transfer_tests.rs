//! Transferer tests: naming, unknown digests, cancellation, the request loop.

use crossbeam_channel::bounded;
use potluck::engine::{Store, hash_bytes};
use potluck::pipeline::CancelToken;
use potluck::transfer::{TransferError, Transferer};
use potluck::utils::is_transfer_temp_name;
use potluck::{TransferRequest, index_dir};
use std::fs;
use std::path::Path;
use std::thread;

const HELLO: &str = "Hello, world!";
const HELLO_HASH: &str = "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3";

fn indexed_share() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let share = dir.path().join("share");
    fs::create_dir_all(share.join("docs")).unwrap();
    fs::write(share.join("hello.txt"), HELLO).unwrap();
    fs::write(share.join("docs").join("notes.md"), "# notes\n").unwrap();
    fs::write(share.join("Makefile"), "all:\n").unwrap();
    let store = Store::open_in_memory().unwrap();
    index_dir(&share, &store).unwrap();
    (dir, store)
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn request(hex: &str) -> TransferRequest {
    TransferRequest {
        digest: hex.parse().unwrap(),
    }
}

#[test]
fn test_transfer_copies_content_named_by_digest_and_extension() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();

    let dest = transferer
        .transfer(&store, &request(HELLO_HASH), &CancelToken::new())
        .unwrap();
    assert_eq!(dest, out.join(format!("{HELLO_HASH}.txt")));
    assert_eq!(fs::read_to_string(&dest).unwrap(), HELLO);
    assert_eq!(output_names(&out), vec![format!("{HELLO_HASH}.txt")]);
}

#[test]
fn test_transfer_of_file_without_extension_has_bare_digest_name() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();
    let digest = hash_bytes(b"all:\n");

    let dest = transferer
        .transfer(&store, &TransferRequest { digest }, &CancelToken::new())
        .unwrap();
    assert_eq!(dest, out.join(digest.to_hex()));
    assert_eq!(fs::read(&dest).unwrap(), b"all:\n");
}

#[test]
fn test_transfer_resolves_nested_paths() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();
    let digest = hash_bytes(b"# notes\n");

    let dest = transferer
        .transfer(&store, &TransferRequest { digest }, &CancelToken::new())
        .unwrap();
    assert_eq!(dest, out.join(format!("{}.md", digest.to_hex())));
}

#[test]
fn test_repeat_transfer_replaces_destination() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();
    let cancel = CancelToken::new();

    transferer.transfer(&store, &request(HELLO_HASH), &cancel).unwrap();
    transferer.transfer(&store, &request(HELLO_HASH), &cancel).unwrap();
    assert_eq!(output_names(&out), vec![format!("{HELLO_HASH}.txt")]);
}

#[test]
fn test_unknown_digest_writes_nothing() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();
    let digest = hash_bytes(b"not in the share");

    match transferer.transfer(&store, &TransferRequest { digest }, &CancelToken::new()) {
        Err(TransferError::UnknownDigest(d)) => assert_eq!(d, digest),
        other => panic!("expected UnknownDigest, got {:?}", other),
    }
    assert!(output_names(&out).is_empty());
}

#[test]
fn test_missing_source_is_a_copy_error() {
    let (dir, store) = indexed_share();
    fs::remove_file(dir.path().join("share").join("hello.txt")).unwrap();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();

    let result = transferer.transfer(&store, &request(HELLO_HASH), &CancelToken::new());
    assert!(matches!(result, Err(TransferError::Copy { .. })));
    assert!(output_names(&out).is_empty());
}

#[test]
fn test_source_changed_since_indexing_is_not_delivered() {
    let (dir, store) = indexed_share();
    let src = dir.path().join("share").join("hello.txt");
    fs::write(&src, "rewritten after the last pass").unwrap();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();

    match transferer.transfer(&store, &request(HELLO_HASH), &CancelToken::new()) {
        Err(TransferError::Stale {
            path,
            expected,
            actual,
        }) => {
            assert_eq!(path, src);
            assert_eq!(expected.to_hex(), HELLO_HASH);
            assert_eq!(actual, hash_bytes(b"rewritten after the last pass"));
        }
        other => panic!("expected Stale, got {:?}", other),
    }
    assert!(output_names(&out).is_empty());
}

#[test]
fn test_run_skips_stale_source_and_keeps_serving() {
    let (dir, store) = indexed_share();
    fs::write(dir.path().join("share").join("hello.txt"), "changed").unwrap();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();
    let notes = hash_bytes(b"# notes\n");
    let (tx, rx) = bounded(0);
    let cancel = CancelToken::new();

    thread::scope(|s| {
        let worker = s.spawn(|| transferer.run(&store, &rx, &cancel));
        tx.send(request(HELLO_HASH)).unwrap();
        tx.send(TransferRequest { digest: notes }).unwrap();
        drop(tx);
        worker.join().unwrap().unwrap();
    });
    assert_eq!(output_names(&out), vec![format!("{}.md", notes.to_hex())]);
}

#[test]
fn test_cancelled_transfer_leaves_no_destination_or_temp() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = transferer.transfer(&store, &request(HELLO_HASH), &cancel);
    assert!(matches!(result, Err(TransferError::Cancelled(_))));
    let names = output_names(&out);
    assert!(names.iter().all(|n| !is_transfer_temp_name(n)));
    assert!(names.is_empty());
}

#[test]
fn test_duplicate_content_transfers_smallest_path() {
    let dir = tempfile::tempdir().unwrap();
    let share = dir.path().join("share");
    fs::create_dir_all(share.join("b")).unwrap();
    fs::create_dir_all(share.join("a")).unwrap();
    fs::write(share.join("b").join("same.log"), "dup").unwrap();
    fs::write(share.join("a").join("same.txt"), "dup").unwrap();
    let store = Store::open_in_memory().unwrap();
    index_dir(&share, &store).unwrap();

    let out = dir.path().join("out");
    let transferer = Transferer::new(&share, &out, false).unwrap();
    let digest = hash_bytes(b"dup");
    let dest = transferer
        .transfer(&store, &TransferRequest { digest }, &CancelToken::new())
        .unwrap();
    assert_eq!(dest, out.join(format!("{}.txt", digest.to_hex())));
}

#[test]
fn test_run_serves_requests_and_survives_unknown_digest() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, false).unwrap();
    let (tx, rx) = bounded(0);
    let cancel = CancelToken::new();

    thread::scope(|s| {
        let worker = s.spawn(|| transferer.run(&store, &rx, &cancel));
        tx.send(TransferRequest {
            digest: hash_bytes(b"nope"),
        })
        .unwrap();
        tx.send(request(HELLO_HASH)).unwrap();
        drop(tx);
        worker.join().unwrap().unwrap();
    });
    assert_eq!(output_names(&out), vec![format!("{HELLO_HASH}.txt")]);
}

#[test]
fn test_strict_run_stops_on_unknown_digest() {
    let (dir, store) = indexed_share();
    let out = dir.path().join("out");
    let transferer = Transferer::new(&dir.path().join("share"), &out, true).unwrap();
    let (tx, rx) = bounded(1);
    let cancel = CancelToken::new();

    tx.send(TransferRequest {
        digest: hash_bytes(b"nope"),
    })
    .unwrap();
    assert!(transferer.run(&store, &rx, &cancel).is_err());
}

#[test]
fn test_run_returns_when_cancelled() {
    let (dir, store) = indexed_share();
    let transferer = Transferer::new(&dir.path().join("share"), &dir.path().join("out"), false).unwrap();
    let (_tx, rx) = bounded::<TransferRequest>(0);
    let cancel = CancelToken::new();
    cancel.cancel();
    transferer.run(&store, &rx, &cancel).unwrap();
}
