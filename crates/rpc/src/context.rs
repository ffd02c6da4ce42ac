// Path: crates/rpc/src/context.rs
//! Shared state the eight verb handlers close over: the durable stores, the
//! signing/claims/wallet collaborators, the live OfferStream registry, and
//! the two remaining external-collaborator seams (MIRROR's outbound HTTP
//! push, PROBE's overlay ping).

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use shardnet_api::claims::ClaimsPolicy;
use shardnet_api::contract_store::ContractStore;
use shardnet_api::shard_store::ShardStore;
use shardnet_api::signer::FarmerSigner;
use shardnet_api::token_table::TokenTable;
use shardnet_api::wallet::WalletIntegration;
use shardnet_offer::OfferStream;
use shardnet_types::contact::Contact;
use shardnet_types::contract::DataHash;

use crate::error::RpcError;

/// Pushes shard bytes to another node's HTTP gateway on MIRROR's behalf.
///
/// Kept as a trait, the way [`WalletIntegration`] and [`FarmerSigner`] are,
/// so this crate never hardcodes an HTTP client: the concrete implementation
/// (a thin `reqwest` wrapper) lives in `node`, which is the only crate that
/// knows the gateway's URL shape.
#[async_trait]
pub trait MirrorTransport: Send + Sync {
    /// Streams the shard at `hash_hex` to `destination`'s `/shards/{hash}`
    /// upload route, authorized by `token`. Returns the destination's ack
    /// body (opaque to this crate) on a 2xx response.
    async fn push(
        &self,
        hash_hex: &str,
        token: &str,
        destination: &Contact,
        shard: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
    ) -> Result<serde_json::Value, RpcError>;
}

/// PROBE's liveness check against the overlay transport.
#[async_trait]
pub trait OverlayPing: Send + Sync {
    /// Pings `target` over the overlay transport, returning `Ok(())` iff it
    /// responded within the transport's own timeout.
    async fn ping(&self, target: &Contact) -> Result<(), RpcError>;
}

/// The registry of live OfferStreams, keyed by the descriptor's `data_hash`
/// -- the shape OFFER looks up and CLAIM/renter-side publication populate.
pub type OfferRegistry = DashMap<DataHash, OfferStream>;

/// Everything the eight verb handlers need, gathered behind `Arc` so
/// `RpcHandlers` (the [`shardnet_api::rpc_ingress::RpcIngress`] implementor)
/// can be cheaply cloned into every inbound-request task.
pub struct HandlerContext {
    /// This node's farmer-side identity, HD key, and signing primitive.
    pub signer: Arc<dyn FarmerSigner>,
    /// The allow-list CLAIM consults before minting a new contract.
    pub claims: Arc<dyn ClaimsPolicy>,
    /// Mints a farmer's `payment_destination` for a CLAIM.
    pub wallet: Arc<dyn WalletIntegration>,
    /// Durable contract descriptors, keyed by `{data_hash}:{counterparty_hd_key}`.
    pub contracts: Arc<dyn ContractStore>,
    /// Content-addressed shard bytes.
    pub shards: Arc<dyn ShardStore>,
    /// Single-use shard-transfer authorization tokens.
    pub tokens: Arc<dyn TokenTable>,
    /// Pushes shard bytes to a remote gateway for MIRROR.
    pub mirror: Arc<dyn MirrorTransport>,
    /// Pings a peer over the overlay transport for PROBE.
    pub overlay: Arc<dyn OverlayPing>,
    /// Open OfferStreams this node is consuming, keyed by `data_hash`.
    pub offer_streams: Arc<OfferRegistry>,
    /// How long a freshly minted authorization token stays valid.
    pub token_ttl_ms: u64,
}

impl HandlerContext {
    /// The current Unix-millisecond timestamp, the single clock read every
    /// handler uses for expiry/TTL comparisons.
    pub fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Mints a fresh opaque token string. A UUID-free random hex string keeps
    /// this crate's dependency footprint to what the rest of the workspace
    /// already pulls in (`rand`, via the `hex` encoding of raw bytes).
    pub fn mint_token() -> String {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}
