// Path: crates/crypto/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! Hashing and HD key derivation for the shardnet storage node: shard
//! content addressing (`RIPEMD160(SHA256(bytes))`) and the BIP32-style
//! non-hardened key derivation behind [`shardnet_api::signer::FarmerSigner`].

/// Content addressing and HD key derivation.
pub mod algorithms;
/// This crate's own error type.
pub mod error;
