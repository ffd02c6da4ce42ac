// Path: crates/networking/src/lib.rs
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

//! The overlay transport: a libp2p swarm carrying the eight RPC verbs over
//! `request_response` and the descriptor/capacity gossip topics over
//! `gossipsub`.

pub mod libp2p;
pub mod metrics;
pub mod traits;

pub use self::libp2p::{
    peer_id_from_multiaddr, Overlay, OverlayBehaviour, OverlayBehaviourEvent, OverlayCommand,
    OverlayEvent, OverlayHandle, RpcCodec, RpcErrorBody, RpcWireRequest, RpcWireResponse,
};
pub use traits::{NodeState, OverlayError};
