//! Content fingerprinting.
//!
//! A fingerprint is the SHA-256 digest of a file's bytes as lowercase hex.
//! It is the global dedup key: byte-identical content yields the same
//! fingerprint regardless of which path it was observed under.

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Digest a byte sequence. Deterministic, no side effects.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read a file and fingerprint its content in one pass.
///
/// Returns the bytes alongside the digest so callers submitting the content
/// for review are guaranteed the fingerprint matches what was actually read.
/// The only failure mode is I/O (permissions, deletion between discovery and
/// read); hashing itself cannot fail.
pub fn read_and_fingerprint(path: &Path) -> io::Result<(Vec<u8>, String)> {
    let bytes = std::fs::read(path)?;
    let fingerprint = fingerprint_bytes(&bytes);
    Ok((bytes, fingerprint))
}
