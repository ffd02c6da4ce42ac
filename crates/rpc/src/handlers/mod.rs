// Path: crates/rpc/src/handlers/mod.rs
//! One module per overlay RPC verb. Each exposes a `handle` function taking
//! the shared [`crate::context::HandlerContext`], the calling [`Contact`](shardnet_types::contact::Contact),
//! and its own typed params, returning its own typed result or an [`crate::error::RpcError`].

/// AUDIT: sequential per-item liveness proofs, never failing as a whole.
pub mod audit;
/// CLAIM: fill in, co-sign, and persist a half-signed descriptor.
pub mod claim;
/// CONSIGN: authorize a shard upload against a still-live contract.
pub mod consign;
/// MIRROR: push a locally held shard to another node's gateway.
pub mod mirror;
/// OFFER: queue a farmer's offer onto an open OfferStream.
pub mod offer;
/// PROBE: liveness check of the calling peer.
pub mod probe;
/// RENEW: extend a contract's validity window and audit commitment.
pub mod renew;
/// RETRIEVE: authorize a shard download.
pub mod retrieve;
