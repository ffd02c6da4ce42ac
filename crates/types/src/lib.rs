// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! The foundational crate for the shardnet storage node: the contract
//! descriptor, the peer contact envelope, the canonical SCALE codec, and the
//! error-kind taxonomy every other crate builds on.
//!
//! As the base crate, this has minimal dependencies and is itself a
//! dependency for almost every other crate in the workspace.

/// The canonical, deterministic binary codec for contract signing preimages.
pub mod codec;
/// The typed peer contact envelope (identity + dialable address info).
pub mod contact;
/// The storage contract descriptor and its field catalog.
pub mod contract;
/// The error-kind taxonomy used across the SDK.
pub mod error;
