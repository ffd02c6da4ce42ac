// Path: crates/proof/src/stream.rs
//! `ProofStream`: consumes shard bytes and a challenge, and produces a
//! compact Merkle proof against the contract's pre-published audit leaves.
//!
//! The operation is: prepend the challenge to the shard
//! bytes, hash the result with the same pre-hash used to produce the
//! corresponding leaf, then produce a compact inclusion proof." The
//! challenge string is `"{index}:{salt_hex}"`: it names both which published
//! leaf it challenges and the per-leaf salt that was mixed into the
//! pre-hash when the audit commitment was first built. A leaf's pre-hash is
//! `SHA256(salt || shard_bytes)`.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ProofError;
use crate::tree::{self, AuditProof, TreeHash};

/// Parses a `"{index}:{salt_hex}"` challenge string.
fn parse_challenge(challenge: &str) -> Result<(usize, [u8; 32]), ProofError> {
    let (index_str, salt_hex) = challenge
        .split_once(':')
        .ok_or_else(|| ProofError::MalformedChallenge(challenge.to_string()))?;
    let index: usize = index_str
        .parse()
        .map_err(|_| ProofError::MalformedChallenge(challenge.to_string()))?;
    let salt_bytes =
        hex::decode(salt_hex).map_err(|_| ProofError::MalformedChallenge(challenge.to_string()))?;
    let salt: [u8; 32] = salt_bytes
        .try_into()
        .map_err(|_| ProofError::MalformedChallenge(challenge.to_string()))?;
    Ok((index, salt))
}

/// Builds a single leaf's salted pre-hash: `SHA256(salt || shard_bytes)`.
pub fn salted_prehash(salt: &[u8; 32], shard_bytes: &[u8]) -> TreeHash {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(shard_bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Builds the full public audit commitment a renter publishes alongside a
/// descriptor: one leaf and one challenge string per salt, in order.
///
/// This is the construction step a two-challenge audit batch needs
/// ("Build `audit_leaves` with 2 challenges using the salted
/// pre-hash scheme") — it lives here, not in the `rpc` crate, since it is
/// the inverse of [`prove`] and shares its pre-hash definition.
pub fn build_audit_commitment(shard_bytes: &[u8], salts: &[[u8; 32]]) -> (Vec<TreeHash>, Vec<String>) {
    let leaves: Vec<TreeHash> = salts
        .iter()
        .map(|salt| salted_prehash(salt, shard_bytes))
        .collect();
    let challenges: Vec<String> = salts
        .iter()
        .enumerate()
        .map(|(i, salt)| format!("{}:{}", i, hex::encode(salt)))
        .collect();
    (leaves, challenges)
}

/// Streams `reader` to completion, recomputes the challenged leaf's salted
/// pre-hash incrementally (never buffering the whole shard), and emits the
/// compact Merkle proof for that leaf against `leaves`.
///
/// Errors:
/// - [`ProofError::NoLeaves`] if `leaves` is empty.
/// - [`ProofError::MalformedChallenge`] / [`ProofError::IndexOutOfRange`] for
///   a challenge that doesn't name a published leaf.
/// - [`ProofError::Truncated`] if `reader` errors before EOF.
/// - [`ProofError::LeafMismatch`] if the recomputed pre-hash disagrees with
///   the published leaf — the shard on disk does not match the commitment.
pub async fn prove<R>(leaves: &[TreeHash], challenge: &str, mut reader: R) -> Result<AuditProof, ProofError>
where
    R: AsyncRead + Unpin,
{
    if leaves.is_empty() {
        return Err(ProofError::NoLeaves);
    }
    let (index, salt) = parse_challenge(challenge)?;
    if index >= leaves.len() {
        return Err(ProofError::IndexOutOfRange {
            index,
            len: leaves.len(),
        });
    }

    let mut hasher = Sha256::new();
    hasher.update(salt);
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| ProofError::Truncated(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut computed_leaf = [0u8; 32];
    computed_leaf.copy_from_slice(&digest);

    if computed_leaf != leaves[index] {
        return Err(ProofError::LeafMismatch(index));
    }

    tree::build_proof(leaves, index).ok_or(ProofError::IndexOutOfRange {
        index,
        len: leaves.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{compute_root, verify};

    #[tokio::test]
    async fn happy_path_proves_and_verifies() {
        let shard = b"this is a test shard";
        let salts = [[0x11u8; 32], [0x22u8; 32]];
        let (leaves, challenges) = build_audit_commitment(shard, &salts);
        let root = compute_root(&leaves).unwrap();

        let proof = prove(&leaves, &challenges[0], &shard[..]).await.unwrap();
        let (expected, computed) = verify(&proof, root, proof.depth);
        assert_eq!(expected, computed);
    }

    #[tokio::test]
    async fn corrupted_shard_fails_to_prove() {
        let shard = b"this is a test shard";
        let salts = [[0x33u8; 32]];
        let (leaves, challenges) = build_audit_commitment(shard, &salts);

        let corrupted = b"this is a corrupted shard";
        let err = prove(&leaves, &challenges[0], &corrupted[..])
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::LeafMismatch(0)));
    }

    #[tokio::test]
    async fn unknown_challenge_index_is_rejected() {
        let shard = b"shard bytes";
        let salts = [[0x44u8; 32]];
        let (leaves, _) = build_audit_commitment(shard, &salts);
        let bogus_challenge = format!("7:{}", hex::encode([0x44u8; 32]));
        let err = prove(&leaves, &bogus_challenge, &shard[..])
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::IndexOutOfRange { .. }));
    }

    #[tokio::test]
    async fn malformed_challenge_is_rejected() {
        let shard = b"shard bytes";
        let salts = [[0x44u8; 32]];
        let (leaves, _) = build_audit_commitment(shard, &salts);
        let err = prove(&leaves, "not-a-challenge", &shard[..]).await.unwrap_err();
        assert!(matches!(err, ProofError::MalformedChallenge(_)));
    }

    #[tokio::test]
    async fn empty_leaf_set_is_rejected() {
        let shard = b"shard bytes";
        let err = prove(&[], "0:11", &shard[..]).await.unwrap_err();
        assert!(matches!(err, ProofError::NoLeaves));
    }
}
