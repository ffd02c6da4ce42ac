// Path: crates/proof/src/tree.rs
//! The compact Merkle scheme backing shard audits: a binary hash tree built
//! directly over the published `audit_leaves` (no extra leaf-level hashing —
//! each leaf is already a salted shard pre-hash), with SHA-256 inner nodes.
//!
//! An odd level is completed by duplicating its last node, the same
//! "duplicate the last leaf" padding convention used by Bitcoin- and
//! Cosmos-style Merkle trees, applied here over the audit leaf set rather
//! than over transaction hashes.

use sha2::{Digest, Sha256};

/// One 32-byte node in the audit tree, leaf or inner.
pub type TreeHash = [u8; 32];

/// `H(0x01 || left || right)`, the canonical inner-node combination.
fn hash_inner(left: &TreeHash, right: &TreeHash) -> TreeHash {
    let mut hasher = Sha256::new();
    hasher.update([0x01]);
    hasher.update(left);
    hasher.update(right);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// A compact inclusion proof: the challenged leaf, its index, and the
/// sibling hashes along the path from that leaf to the root, in bottom-up
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditProof {
    /// The leaf payload at `index` (the recomputed salted pre-hash).
    pub leaf: TreeHash,
    /// The challenged leaf's position in the published leaf set.
    pub index: u32,
    /// The number of sibling hashes in the path (tree height).
    pub depth: u32,
    /// Sibling hashes, one per level, bottom-up.
    pub siblings: Vec<TreeHash>,
}

/// Computes the root of the audit tree over `leaves`. Returns `None` for an
/// empty leaf set — callers should treat that as [`crate::ProofError::NoLeaves`].
pub fn compute_root(leaves: &[TreeHash]) -> Option<TreeHash> {
    if leaves.is_empty() {
        return None;
    }
    let mut level: Vec<TreeHash> = leaves.to_vec();
    while level.len() > 1 {
        level = combine_level(&level);
    }
    level.into_iter().next()
}

fn combine_level(level: &[TreeHash]) -> Vec<TreeHash> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    let mut i = 0;
    while i < level.len() {
        let left = level[i];
        let right = if i + 1 < level.len() {
            level[i + 1]
        } else {
            level[i]
        };
        next.push(hash_inner(&left, &right));
        i += 2;
    }
    next
}

/// Builds the compact inclusion proof for `leaves[index]`.
///
/// Returns `None` if `index` is out of range; callers map that to
/// [`crate::ProofError::IndexOutOfRange`].
pub fn build_proof(leaves: &[TreeHash], index: usize) -> Option<AuditProof> {
    if index >= leaves.len() {
        return None;
    }
    let mut level: Vec<TreeHash> = leaves.to_vec();
    let mut pos = index;
    let mut siblings = Vec::new();

    while level.len() > 1 {
        let sibling_pos = if pos % 2 == 0 { pos + 1 } else { pos - 1 };
        let sibling = if sibling_pos < level.len() {
            level[sibling_pos]
        } else {
            level[pos]
        };
        siblings.push(sibling);
        level = combine_level(&level);
        pos /= 2;
    }

    Some(AuditProof {
        leaf: leaves[index],
        index: index as u32,
        depth: siblings.len() as u32,
        siblings,
    })
}

/// Recomputes the root implied by `proof`, walking the sibling path bottom-up
/// using `proof.index`'s bits to decide left/right combination order at each
/// level.
fn compute_root_from_proof(proof: &AuditProof) -> TreeHash {
    let mut current = proof.leaf;
    let mut index = proof.index;
    for sibling in &proof.siblings {
        current = if index % 2 == 0 {
            hash_inner(&current, sibling)
        } else {
            hash_inner(sibling, &current)
        };
        index /= 2;
    }
    current
}

/// Verifies `proof` against `expected_root` and `depth`.
///
/// Returns `(expected_root, computed_root)` for the caller to compare. A
/// depth mismatch is treated as a verification failure by returning a computed
/// root that cannot equal a genuine 32-byte root (an all-zero sentinel),
/// rather than panicking on a malformed proof.
pub fn verify(proof: &AuditProof, expected_root: TreeHash, depth: u32) -> (TreeHash, TreeHash) {
    if proof.depth != depth || proof.siblings.len() as u32 != depth {
        return (expected_root, [0u8; 32]);
    }
    (expected_root, compute_root_from_proof(proof))
}
