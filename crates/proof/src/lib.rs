// Path: crates/proof/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Streaming audit-proof prover and verifier (`ProofStream`): a compact
//! Merkle inclusion proof over a pre-published set of salted shard
//! pre-hashes, proven against a live shard byte stream.

/// The shared error type raised while proving or verifying an audit proof.
pub mod error;
/// The binary Merkle tree over audit leaves: root computation and compact
/// proof construction/verification.
pub mod tree;
/// The streaming prover: recomputes a challenged leaf against a live shard
/// byte stream and emits its compact inclusion proof.
pub mod stream;

pub use error::ProofError;
pub use stream::{build_audit_commitment, prove, salted_prehash};
pub use tree::{build_proof, compute_root, verify, AuditProof, TreeHash};
