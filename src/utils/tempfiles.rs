//! Atomic destination writes: copy into a temp file beside the destination, then rename.

use sha2::{Digest as _, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use tempfile::Builder;

use crate::Digest;
use crate::engine::hashing::finish;
use crate::pipeline::CancelToken;
use crate::utils::config::{HashingConsts, PackagePaths};

/// Result of [`copy_verified`].
#[derive(Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Destination now holds the full content; carries the byte count.
    Written(u64),
    /// The source no longer hashes to the expected digest. Carries what it hashed to; nothing
    /// was written.
    Mismatch(Digest),
    /// Cancellation was raised mid-copy; the temp file was removed and `dest` left untouched.
    Cancelled,
}

/// Copy `src` to `dest` so that `dest` only ever appears complete, and only if the bytes copied
/// hash to `expected`.
///
/// The copied bytes are hashed on the way through, so a source rewritten since it was indexed
/// can never land under the old digest's name. The temp file lives in `dest`'s directory so the
/// final rename stays on one filesystem. Racing writers of the same `dest` each rename a complete
/// file; last rename wins.
pub fn copy_verified(
    src: &Path,
    dest: &Path,
    expected: &Digest,
    cancel: &CancelToken,
) -> io::Result<CopyOutcome> {
    let dir = dest.parent().unwrap_or(Path::new("."));
    let mut reader = BufReader::with_capacity(HashingConsts::COPY_CHUNK_SIZE, File::open(src)?);
    let mut temp = Builder::new()
        .prefix(PackagePaths::get().temp_prefix())
        .suffix(".tmp")
        .tempfile_in(dir)?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HashingConsts::COPY_CHUNK_SIZE];
    let mut written = 0_u64;
    loop {
        if cancel.is_cancelled() {
            // Dropping `temp` deletes it.
            return Ok(CopyOutcome::Cancelled);
        }
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        temp.write_all(&buffer[..n])?;
        written += n as u64;
    }

    let actual = finish(hasher);
    if actual != *expected {
        return Ok(CopyOutcome::Mismatch(actual));
    }
    temp.as_file().sync_all()?;
    temp.persist(dest).map_err(|e| e.error)?;
    Ok(CopyOutcome::Written(written))
}

/// True for names produced by [`copy_verified`] while a copy is in flight.
pub fn is_transfer_temp_name(name: &str) -> bool {
    name.starts_with(PackagePaths::get().temp_prefix()) && name.ends_with(".tmp")
}
