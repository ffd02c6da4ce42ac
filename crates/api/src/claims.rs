// Path: crates/api/src/claims.rs
//! The farmer's claims policy: which renters are allowed to CLAIM capacity
//! from this node, via an allow-list of renter extended public keys
//! (possibly a wildcard `*`). The whitelist's *consultation* is in scope
//! here (the CLAIM handler calls it); its *construction/management*
//! (profile-level configuration) is an external collaborator's job.

/// Decides whether a renter's extended public key may CLAIM capacity.
pub trait ClaimsPolicy: Send + Sync {
    /// `true` iff `renter_hd_key` is present in the allow-list, or the
    /// allow-list is the wildcard `*`.
    fn is_allowed(&self, renter_hd_key: &[u8]) -> bool;
}

/// A static allow-list, with an optional wildcard that accepts everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    /// `true` accepts any renter regardless of `allowed`.
    pub wildcard: bool,
    /// Specific renter extended public keys accepted when `wildcard` is `false`.
    pub allowed: Vec<Vec<u8>>,
}

impl ClaimsPolicy for AllowList {
    fn is_allowed(&self, renter_hd_key: &[u8]) -> bool {
        self.wildcard || self.allowed.iter().any(|k| k.as_slice() == renter_hd_key)
    }
}
