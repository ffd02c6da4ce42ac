// Path: crates/api/src/signer.rs
//! The farmer-side signing seam: mints a fresh non-hardened HD index per
//! contract and signs over a descriptor's canonical preimage with the
//! corresponding child key. Kept as a trait, like [`crate::wallet::WalletIntegration`],
//! so `rpc`'s handlers never depend on a concrete HD scheme — the HD
//! derivation and signature primitives are an external collaborator.

use shardnet_types::contact::Identity;
use shardnet_types::contract::{HdKey, Signature};

/// This node's farmer-side signing identity.
pub trait FarmerSigner: Send + Sync {
    /// This node's identity hash.
    fn identity(&self) -> Identity;
    /// This node's long-term extended public key, published as a contract's
    /// `farmer_hd_key`.
    fn hd_key(&self) -> HdKey;
    /// Allocates a fresh non-hardened derivation index for a new contract.
    /// Implementations MUST never reuse an index already allocated to a live
    /// contract.
    fn allocate_hd_index(&self) -> u32;
    /// Signs `message` (a contract's blanked canonical preimage) with the
    /// child key at `index`.
    fn sign_child(&self, index: u32, message: &[u8]) -> Signature;
    /// Verifies a detached signature against a counterparty's extended
    /// public key at the given non-hardened index — the closure
    /// [`shardnet_types::contract::Contract::is_valid_with`] and `OfferStream`'s
    /// admission policy both need.
    fn verify_child(&self, xpub: &HdKey, index: u32, message: &[u8], signature: &Signature) -> bool;
}
