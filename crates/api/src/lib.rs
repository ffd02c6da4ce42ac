// Path: crates/api/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]

//! Core traits and interfaces for the shardnet storage node. This crate
//! defines the stable contract every concrete collaborator (`storage`,
//! `crypto`, `node`, ...) implements, so `rpc`'s handlers and `gateway`'s
//! routes can be written against trait objects rather than concrete types.

/// The farmer's claims policy: which renters may CLAIM capacity.
pub mod claims;
/// A durable store of storage contracts, keyed by `{hash}:{counterparty}`.
pub mod contract_store;
/// Re-exports the error-kind taxonomy every collaborator error maps into.
pub mod error;
/// Shared types for the OfferStream auction subsystem.
pub mod offer;
/// The trait binding the HTTP gateway's RPC ingress route to `rpc`'s handlers.
pub mod rpc_ingress;
/// A content-addressed store of shard bytes.
pub mod shard_store;
/// The farmer-side signing seam used to sign and verify per-contract child keys.
pub mod signer;
/// An ephemeral, single-use shard-transfer authorization token table.
pub mod token_table;
/// The `WalletIntegration` external collaborator used by CLAIM.
pub mod wallet;

pub use error::{ErrorKind, HasErrorKind};

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::claims::{AllowList, ClaimsPolicy};
    pub use crate::contract_store::{contract_key, ContractError, ContractStore};
    pub use crate::error::{ErrorKind, HasErrorKind};
    pub use crate::offer::{OfferError, OfferOptions};
    pub use crate::rpc_ingress::{RpcIngress, RpcIngressError};
    pub use crate::shard_store::{ShardStore, ShardStoreError};
    pub use crate::signer::FarmerSigner;
    pub use crate::token_table::{TokenError, TokenRecord, TokenTable};
    pub use crate::wallet::{WalletError, WalletIntegration};
}