// crates/types/src/contract.rs
//! The storage contract descriptor: the signed document binding a renter and a
//! farmer to the storage of one content-addressed shard.
//!
//! The wire shape is an open field→scalar map in the source system this was
//! distilled from; here the field catalog is closed and typed, with `get`/`set`
//! and `diff` operating over an explicit `ContractField` enum so the schema is
//! enforced by the compiler rather than by runtime checks scattered across
//! call sites.

use crate::codec::to_bytes_canonical;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A 20-byte RIPEMD160 content hash, lowercase-hex encoded at the edges.
pub type DataHash = [u8; 20];

/// An extended public key, opaque beyond its byte representation.
pub type HdKey = Vec<u8>;

/// A detached signature over a contract's canonical signing preimage.
pub type Signature = Vec<u8>;

/// One of the two counterparties to a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum Role {
    /// The party buying storage capacity.
    Renter,
    /// The party selling storage capacity.
    Farmer,
}

/// A single salted-pre-hash Merkle leaf used by the audit scheme.
pub type AuditLeaf = [u8; 32];

/// The fixed catalog of descriptor fields, used by both serialization and
/// `diff`. Ordering here is the canonical field order for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Encode, Decode, Serialize, Deserialize)]
pub enum ContractField {
    /// See [`Contract::data_hash`].
    DataHash,
    /// See [`Contract::data_size`].
    DataSize,
    /// See [`Contract::renter_id`].
    RenterId,
    /// See [`Contract::farmer_id`].
    FarmerId,
    /// See [`Contract::renter_hd_key`].
    RenterHdKey,
    /// See [`Contract::farmer_hd_key`].
    FarmerHdKey,
    /// See [`Contract::renter_hd_index`].
    RenterHdIndex,
    /// See [`Contract::farmer_hd_index`].
    FarmerHdIndex,
    /// See [`Contract::renter_signature`].
    RenterSignature,
    /// See [`Contract::farmer_signature`].
    FarmerSignature,
    /// See [`Contract::store_begin`].
    StoreBegin,
    /// See [`Contract::store_end`].
    StoreEnd,
    /// See [`Contract::audit_leaves`].
    AuditLeaves,
    /// See [`Contract::payment_destination`].
    PaymentDestination,
    /// See [`Contract::version`].
    Version,
}

/// Fields a RENEW may legally change. Anything else differing between the
/// locally stored contract and a proposed renewal is rejected.
pub const RENEWABLE_FIELDS: &[ContractField] = &[
    ContractField::RenterId,
    ContractField::RenterHdKey,
    ContractField::RenterSignature,
    ContractField::StoreBegin,
    ContractField::StoreEnd,
    ContractField::AuditLeaves,
];

/// A storage contract descriptor.
///
/// `Contract::from_parts` never fails: a descriptor built from nonsense data
/// is a valid `Contract` value whose [`Contract::is_valid`] reports `false`.
/// This mirrors the source behavior that `from(nonsense)` never throws.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Contract {
    /// RIPEMD160(SHA256(shard bytes)); content address of the backing shard.
    pub data_hash: DataHash,
    /// Declared size of the shard in bytes.
    pub data_size: u64,
    /// Node identity hash of the renter.
    pub renter_id: [u8; 20],
    /// Node identity hash of the farmer.
    pub farmer_id: [u8; 20],
    /// Renter's extended public key.
    pub renter_hd_key: HdKey,
    /// Farmer's extended public key.
    pub farmer_hd_key: HdKey,
    /// Non-hardened derivation index under `renter_hd_key`.
    pub renter_hd_index: u32,
    /// Non-hardened derivation index under `farmer_hd_key`.
    pub farmer_hd_index: u32,
    /// Detached signature by the renter over the blanked canonical preimage.
    pub renter_signature: Option<Signature>,
    /// Detached signature by the farmer over the blanked canonical preimage.
    pub farmer_signature: Option<Signature>,
    /// Unix-millisecond validity window start.
    pub store_begin: u64,
    /// Unix-millisecond validity window end. MUST be greater than `store_begin`.
    pub store_end: u64,
    /// Ordered Merkle leaves derived from salted shard pre-hashes.
    pub audit_leaves: Vec<AuditLeaf>,
    /// Opaque wallet address payment flows to.
    pub payment_destination: String,
    /// Descriptor schema version.
    pub version: u16,
}

impl Contract {
    /// Builds the canonical signing preimage: the SCALE encoding of the
    /// descriptor with both signature fields blanked. Both `sign` and
    /// `is_valid` route through this single implementation so the preimage
    /// construction cannot drift between the two call sites.
    pub fn signing_preimage(&self) -> Vec<u8> {
        let mut blanked = self.clone();
        blanked.renter_signature = None;
        blanked.farmer_signature = None;
        // `to_bytes_canonical` only fails on implementations that can't
        // encode; `Contract`'s derive always succeeds.
        to_bytes_canonical(&blanked).expect("Contract encoding is infallible")
    }

    /// Returns the hex-encoded, lowercase, 40-character content address.
    pub fn data_hash_hex(&self) -> String {
        hex::encode(self.data_hash)
    }

    /// Returns the signature field, HD key, and per-contract derivation index
    /// for a given role. The index is what lets `verify` check the
    /// signature against the *per-contract child key*, not the long-term
    /// extended public key itself — `renter_hd_key`/`farmer_hd_key` are
    /// reusable across many contracts, so only the indexed child key is
    /// ever actually used to sign.
    fn signature_and_key(&self, role: Role) -> (&Option<Signature>, &HdKey, u32) {
        match role {
            Role::Renter => (&self.renter_signature, &self.renter_hd_key, self.renter_hd_index),
            Role::Farmer => (&self.farmer_signature, &self.farmer_hd_key, self.farmer_hd_index),
        }
    }

    /// `true` iff every required field is populated with a well-formed value
    /// and every populated signature verifies against its counterparty's
    /// per-contract child key (`*_hd_key` derived at `*_hd_index`).
    ///
    /// Signature verification itself is an external concern (HD derivation
    /// and signature primitives are out of scope here); the
    /// `verify` closure is supplied by the caller and is expected to derive
    /// the child key at `index` under `key` and check the detached
    /// signature against it.
    pub fn is_valid_with<F>(&self, verify: F) -> bool
    where
        F: Fn(&HdKey, u32, &[u8], &Signature) -> bool,
    {
        if self.store_end <= self.store_begin {
            return false;
        }
        if self.renter_hd_key.is_empty() || self.farmer_hd_key.is_empty() {
            return false;
        }
        if self.payment_destination.is_empty() && self.farmer_signature.is_some() {
            // A completed contract must have routed payment_destination
            // through the wallet integration rather than leaving it blank.
            return false;
        }
        let preimage = self.signing_preimage();
        for role in [Role::Renter, Role::Farmer] {
            let (sig, key, index) = self.signature_and_key(role);
            if let Some(sig) = sig {
                if !verify(key, index, &preimage, sig) {
                    return false;
                }
            }
        }
        true
    }

    /// `true` iff both signatures are present. Does not itself verify them;
    /// pair with `is_valid_with` for the full invariant.
    pub fn is_complete(&self) -> bool {
        self.renter_signature.is_some() && self.farmer_signature.is_some()
    }

    /// Sets the signature field for `role` to the detached signature produced
    /// by `sign` over the blanked canonical preimage.
    pub fn sign_with<F>(&mut self, role: Role, sign: F)
    where
        F: FnOnce(&[u8]) -> Signature,
    {
        let preimage = self.signing_preimage();
        let sig = sign(&preimage);
        match role {
            Role::Renter => self.renter_signature = Some(sig),
            Role::Farmer => self.farmer_signature = Some(sig),
        }
    }

    /// The set of field names whose values differ between `a` and `b`, by
    /// deep-equality. Set-semantic, not structural: fields not present on
    /// both sides (there are none in this closed schema) would also count.
    pub fn diff(a: &Contract, b: &Contract) -> BTreeSet<ContractField> {
        let mut out = BTreeSet::new();
        macro_rules! check {
            ($field:ident, $variant:ident) => {
                if a.$field != b.$field {
                    out.insert(ContractField::$variant);
                }
            };
        }
        check!(data_hash, DataHash);
        check!(data_size, DataSize);
        check!(renter_id, RenterId);
        check!(farmer_id, FarmerId);
        check!(renter_hd_key, RenterHdKey);
        check!(farmer_hd_key, FarmerHdKey);
        check!(renter_hd_index, RenterHdIndex);
        check!(farmer_hd_index, FarmerHdIndex);
        check!(renter_signature, RenterSignature);
        check!(farmer_signature, FarmerSignature);
        check!(store_begin, StoreBegin);
        check!(store_end, StoreEnd);
        check!(audit_leaves, AuditLeaves);
        check!(payment_destination, PaymentDestination);
        check!(version, Version);
        out
    }

    /// Returns the first field (in canonical order) present in `diff` but not
    /// in `allowed`, if any — used by RENEW to name the rejected field.
    pub fn first_disallowed_diff(
        diff: &BTreeSet<ContractField>,
        allowed: &[ContractField],
    ) -> Option<ContractField> {
        diff.iter().find(|f| !allowed.contains(f)).copied()
    }

    /// A 4-byte hex code (8 hex chars) expressing this descriptor's size and
    /// duration bucket, used as the pub/sub topic suffix.
    pub fn topic_string(&self) -> String {
        let size_bucket = size_bucket(self.data_size);
        let duration_bucket = duration_bucket(self.store_end.saturating_sub(self.store_begin));
        let code: u32 = ((size_bucket as u32) << 16) | (duration_bucket as u32);
        format!("{:08x}", code)
    }
}

/// Buckets a shard size into one of 16 power-of-two-ish classes.
fn size_bucket(size: u64) -> u16 {
    if size == 0 {
        return 0;
    }
    (64 - size.leading_zeros()).min(u16::MAX as u32) as u16
}

/// Buckets a validity-window duration (milliseconds) into one of 16 classes.
fn duration_bucket(duration_ms: u64) -> u16 {
    const DAY_MS: u64 = 86_400_000;
    let days = duration_ms / DAY_MS;
    if days == 0 {
        return 0;
    }
    (64 - days.leading_zeros()).min(u16::MAX as u32) as u16
}

impl ContractField {
    /// The field name as it appears in error messages, e.g. the RENEW
    /// rejection `"Rejecting renewal of {field}"`.
    pub fn name(&self) -> &'static str {
        match self {
            ContractField::DataHash => "data_hash",
            ContractField::DataSize => "data_size",
            ContractField::RenterId => "renter_id",
            ContractField::FarmerId => "farmer_id",
            ContractField::RenterHdKey => "renter_hd_key",
            ContractField::FarmerHdKey => "farmer_hd_key",
            ContractField::RenterHdIndex => "renter_hd_index",
            ContractField::FarmerHdIndex => "farmer_hd_index",
            ContractField::RenterSignature => "renter_signature",
            ContractField::FarmerSignature => "farmer_signature",
            ContractField::StoreBegin => "store_begin",
            ContractField::StoreEnd => "store_end",
            ContractField::AuditLeaves => "audit_leaves",
            ContractField::PaymentDestination => "payment_destination",
            ContractField::Version => "version",
        }
    }
}

impl std::fmt::Display for ContractField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Contract {
        Contract {
            data_hash: [0x11; 20],
            data_size: 1024,
            renter_id: [1; 20],
            farmer_id: [2; 20],
            renter_hd_key: vec![9; 33],
            farmer_hd_key: vec![8; 33],
            renter_hd_index: 0,
            farmer_hd_index: 0,
            renter_signature: None,
            farmer_signature: None,
            store_begin: 1_000,
            store_end: 2_000,
            audit_leaves: vec![[0u8; 32]],
            payment_destination: String::new(),
            version: 1,
        }
    }

    #[test]
    fn incomplete_contract_is_not_complete() {
        let c = sample();
        assert!(!c.is_complete());
    }

    #[test]
    fn invalid_window_fails_validity() {
        let mut c = sample();
        c.store_end = c.store_begin;
        assert!(!c.is_valid_with(|_, _, _, _| true));
    }

    #[test]
    fn diff_detects_only_changed_fields() {
        let a = sample();
        let mut b = a.clone();
        b.farmer_hd_key = vec![7; 33];
        let d = Contract::diff(&a, &b);
        assert_eq!(d, BTreeSet::from([ContractField::FarmerHdKey]));
    }

    #[test]
    fn renewal_rejects_disallowed_field() {
        let a = sample();
        let mut b = a.clone();
        b.farmer_hd_key = vec![7; 33];
        let d = Contract::diff(&a, &b);
        let rejected = Contract::first_disallowed_diff(&d, RENEWABLE_FIELDS);
        assert_eq!(rejected, Some(ContractField::FarmerHdKey));
    }

    #[test]
    fn renewal_allows_allowed_fields_only() {
        let a = sample();
        let mut b = a.clone();
        b.store_begin = 1_500;
        b.store_end = 3_000;
        let d = Contract::diff(&a, &b);
        assert_eq!(Contract::first_disallowed_diff(&d, RENEWABLE_FIELDS), None);
    }

    #[test]
    fn topic_string_is_stable_for_same_bucket() {
        let a = sample();
        let mut b = a.clone();
        b.data_hash = [0x22; 20]; // unrelated field
        assert_eq!(a.topic_string(), b.topic_string());
    }
}
