//! File hashing utilities

use anyhow::Result;
use sha2::{Digest as _, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::Digest;
use crate::pipeline::CancelToken;
use crate::utils::config::HashingConsts;

/// SHA-256 of a file, streamed in bounded chunks whatever its size.
///
/// A file truncated or rewritten mid-read yields whatever bytes were read (or an I/O error),
/// never a crash; the next pass picks up the settled content. `size` only sizes the buffer.
/// Returns `Ok(None)` when `cancel` fires between read chunks.
pub fn hash_file(path: &Path, size: u64, cancel: Option<&CancelToken>) -> Result<Option<Digest>> {
    let file = File::open(path)?;
    let chunk = usize::try_from(size)
        .unwrap_or(usize::MAX)
        .clamp(8 * 1024, HashingConsts::HASH_READ_CHUNK_SIZE);
    let mut reader = BufReader::with_capacity(chunk, file);
    let mut buffer = vec![0u8; chunk];
    let mut hasher = Sha256::new();
    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Ok(None);
        }
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(Some(finish(hasher)))
}

/// SHA-256 of an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> Digest {
    Digest::from_bytes(Sha256::digest(bytes).into())
}

/// Close out a streaming hasher into a [`Digest`].
pub(crate) fn finish(hasher: Sha256) -> Digest {
    Digest::from_bytes(hasher.finalize().into())
}
