//! Hash primitive (spec component D): a 64-bit non-cryptographic content digest.
//!
//! Reads a file in chunks no larger than the caller-supplied scratch buffer and
//! folds the bytes through xxHash64 with a fixed seed. Equal contents always
//! produce equal digests; unequal contents may coincidentally collide with
//! probability roughly 2^-64 — acceptable for duplicate *detection*, not for
//! anything requiring cryptographic collision resistance (see spec §9).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use xxhash_rust::xxh64::Xxh64;

/// Fixed seed so that two runs over the same bytes always agree.
const HASH_SEED: u64 = 0;

/// Compute the 64-bit content hash of the file at `path`, reusing `scratch` as
/// the read buffer. `scratch` must be non-empty.
pub fn hash_file(path: &Path, scratch: &mut [u8]) -> std::io::Result<u64> {
    debug_assert!(!scratch.is_empty(), "scratch buffer must not be empty");

    let mut file = File::open(path)?;
    let mut hasher = Xxh64::new(HASH_SEED);
    loop {
        let n = file.read(scratch)?;
        if n == 0 {
            break;
        }
        hasher.update(&scratch[..n]);
    }
    Ok(hasher.digest())
}

/// Hash a full path's *bytes*, synthesized for zero-length-file disambiguation
/// (spec §4.I, §9): hashes the UTF-8 bytes of the path string itself rather
/// than file contents, so two distinct empty files never collide.
#[must_use]
pub fn hash_path_bytes(path: &str) -> u64 {
    let mut hasher = Xxh64::new(HASH_SEED);
    hasher.update(path.as_bytes());
    hasher.digest()
}
