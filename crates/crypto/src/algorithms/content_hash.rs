// Path: crates/crypto/src/algorithms/content_hash.rs
//! Content addressing for shards: `RIPEMD160(SHA256(bytes))`.
//!
//! `dcrypt` (the crate the rest of this module wraps for SHA-256/512) has no
//! RIPEMD160 implementation, so this module reaches for `sha2` + `ripemd`
//! directly — the same pair the broader example pack uses for this exact
//! composition (RIPEMD160-over-SHA256 is the classic "hash160" construction).

use crate::error::CryptoError;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// The width, in bytes, of a shard content address.
pub const DATA_HASH_LEN: usize = 20;

/// Computes `RIPEMD160(SHA256(bytes))`, the content address ("`data_hash`")
/// of a shard.
pub fn data_hash(bytes: &[u8]) -> [u8; DATA_HASH_LEN] {
    let sha = Sha256::digest(bytes);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; DATA_HASH_LEN];
    out.copy_from_slice(&ripe);
    out
}

/// A streaming variant for hashing shard bytes as they arrive over an
/// upload, without buffering the whole shard in memory: feed chunks via
/// [`StreamingDataHasher::update`], then [`StreamingDataHasher::finalize`].
#[derive(Default)]
pub struct StreamingDataHasher {
    sha: Sha256,
}

impl StreamingDataHasher {
    /// Creates a fresh hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of shard bytes into the running SHA-256 digest.
    pub fn update(&mut self, chunk: &[u8]) {
        self.sha.update(chunk);
    }

    /// Finalizes the digest and applies RIPEMD160, returning the content address.
    pub fn finalize(self) -> [u8; DATA_HASH_LEN] {
        let sha_digest = self.sha.finalize();
        let ripe = Ripemd160::digest(sha_digest);
        let mut out = [0u8; DATA_HASH_LEN];
        out.copy_from_slice(&ripe);
        out
    }
}

/// Parses a lowercase hexadecimal `data_hash` string into its 20-byte form,
/// rejecting anything not exactly 40 hex characters.
pub fn parse_data_hash_hex(s: &str) -> Result<[u8; DATA_HASH_LEN], CryptoError> {
    if s.len() != DATA_HASH_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidInput(format!(
            "data_hash must be {} lowercase hex chars, got {:?}",
            DATA_HASH_LEN * 2,
            s
        )));
    }
    let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| CryptoError::InvalidHashLength {
            expected: DATA_HASH_LEN,
            got: b.len(),
        })
}
