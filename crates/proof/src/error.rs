// Path: crates/proof/src/error.rs
//! Errors a [`crate::stream::prove`] or [`crate::tree::verify`] call can raise.
//!
//! Every variant here classifies as [`ErrorKind::Auditable`]: a failed or
//! truncated proof during AUDIT is never surfaced as an RPC error — the
//! handler catches it and encodes `proof: null`
//! instead. The classification still matters for metrics labeling, so it is
//! not skipped just because the RPC layer swallows it.

use shardnet_types::error::{ErrorKind, HasErrorKind};
use thiserror::Error;

/// Failures raised while proving or verifying a compact Merkle audit proof.
#[derive(Debug, Error)]
pub enum ProofError {
    /// The challenge string did not parse as `"{index}:{salt_hex}"`.
    #[error("malformed challenge string: {0}")]
    MalformedChallenge(String),
    /// The challenge names a leaf index outside the published leaf set.
    #[error("challenge index {index} out of range for {len} published leaves")]
    IndexOutOfRange {
        /// The out-of-range index named by the challenge.
        index: usize,
        /// The number of leaves actually published.
        len: usize,
    },
    /// The leaf set is empty; no audit commitment was ever published.
    #[error("no audit leaves published for this contract")]
    NoLeaves,
    /// The shard byte stream ended before the challenged pre-hash could be
    /// completed (the contract claims a shard that isn't fully present).
    #[error("shard stream truncated before challenge could be proven: {0}")]
    Truncated(String),
    /// The shard bytes, salted with the challenge, do not hash to the leaf
    /// published at the challenged index — the shard has been corrupted,
    /// replaced, or the commitment was built over different bytes.
    #[error("recomputed leaf does not match the published audit leaf at index {0}")]
    LeafMismatch(usize),
}

impl HasErrorKind for ProofError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Auditable
    }
}
