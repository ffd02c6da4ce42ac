// Path: crates/crypto/src/algorithms/mod.rs
//! Cryptographic algorithm implementations grouped by purpose.

/// Content addressing (`RIPEMD160(SHA256(bytes))`) for shards.
pub mod content_hash;
/// General-purpose hash functions (SHA-256/512) via `dcrypt`.
pub mod hash;
/// Non-hardened hierarchical-deterministic key derivation.
pub mod hd;
