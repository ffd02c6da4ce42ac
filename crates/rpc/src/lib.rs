// Path: crates/rpc/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! The eight overlay RPC verb handlers: OFFER,
//! CLAIM, CONSIGN, RETRIEVE, MIRROR, AUDIT, RENEW, PROBE.
//!
//! `RpcHandlers` is the single [`shardnet_api::rpc_ingress::RpcIngress`]
//! implementor `node` wires into both the HTTP gateway's `POST /rpc/` route
//! and, on a full overlay transport binding, `networking`'s
//! request-response behaviour.

/// The shared state every handler closes over, plus the `MirrorTransport`
/// and `OverlayPing` external-collaborator seams.
pub mod context;
/// `RpcError`: the error type every handler returns.
pub mod error;
/// One module per verb.
pub mod handlers;
/// The `RpcIngress` dispatcher.
pub mod ingress;

pub use context::{HandlerContext, MirrorTransport, OfferRegistry, OverlayPing};
pub use error::RpcError;
pub use ingress::RpcHandlers;
