// Path: crates/node/src/lib.rs
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

//! The shardnet storage node: glues the durable stores, the eight RPC
//! handlers, the libp2p overlay transport, and the HTTP shard-transfer
//! gateway into one runnable peer.
//!
//! This node's own mutable state -- the capacity cache, plus the periodic
//! sweep/reap/compaction decisions -- lives behind a single actor task
//! ([`actor::run`]) reachable only through [`NodeHandle`]'s command channel,
//! the same shape as the overlay transport's own swarm-driving actor. The
//! durable stores behind
//! [`shardnet_rpc::context::HandlerContext`] are themselves already
//! concurrency-safe (`redb`'s own transaction isolation, `dashmap`'s
//! striped locking) and are shared via `Arc` directly into the RPC handler
//! functions, exactly as `shardnet_rpc::ingress::RpcHandlers` already wires
//! them -- this crate does not re-wrap them a second time behind the actor.

mod actor;
/// The renter-side farmer-capacity cache, populated from gossip.
pub mod capacity;
/// The client-side verbs a Node exposes to a local caller.
pub mod client;
/// Configuration: CLI/env/TOML layering.
pub mod config;
/// A `reqwest`-based `MirrorTransport`.
pub mod mirror;
/// A libp2p-dial-based `OverlayPing`.
pub mod ping;
/// A BIP32-style `FarmerSigner`.
pub mod signer;
/// A deterministic placeholder `WalletIntegration`.
pub mod wallet;

use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use shardnet_api::claims::AllowList;
use shardnet_api::rpc_ingress::{RpcIngress, RpcIngressError};
use shardnet_networking::{Overlay, OverlayHandle};
use shardnet_rpc::context::HandlerContext;
use shardnet_rpc::RpcHandlers;
use shardnet_storage::contract_store::RedbContractStore;
use shardnet_storage::shard_store::FsShardStore;
use shardnet_storage::token_table::InMemoryTokenTable;
use shardnet_types::contact::{AddressInfo, Contact};
use shardnet_types::error::ErrorKind;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::capacity::CapacityCache;
use crate::client::NodeClient;
use crate::config::ResolvedConfig;
use crate::mirror::HttpMirrorTransport;
use crate::ping::LibP2pOverlayPing;
use crate::signer::LocalFarmerSigner;
use crate::wallet::LocalWallet;

/// A not-yet-ready [`RpcIngress`] that becomes a real [`RpcHandlers`] once
/// this node finishes constructing its [`HandlerContext`] -- needed because
/// the overlay transport must exist (to hand `HandlerContext` its
/// `OverlayPing`) before `RpcHandlers` can exist, but the overlay transport
/// itself needs an `RpcIngress` at construction time.
struct DeferredIngress {
    inner: std::sync::OnceLock<Arc<RpcHandlers>>,
}

impl DeferredIngress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: std::sync::OnceLock::new(),
        })
    }

    fn resolve(&self, handlers: Arc<RpcHandlers>) {
        // `set` only fails if already set; a node never resolves twice.
        let _ = self.inner.set(handlers);
    }
}

#[async_trait::async_trait]
impl RpcIngress for DeferredIngress {
    async fn dispatch(
        &self,
        verb: &str,
        params: serde_json::Value,
        caller: Contact,
    ) -> Result<serde_json::Value, RpcIngressError> {
        match self.inner.get() {
            Some(handlers) => handlers.dispatch(verb, params, caller).await,
            None => Err(RpcIngressError::new(
                ErrorKind::Upstream,
                "node is still starting up",
            )),
        }
    }
}

/// A running shardnet storage node.
pub struct Node {
    ctx: Arc<HandlerContext>,
    overlay: Arc<Overlay>,
    overlay_handle: OverlayHandle,
    client: NodeClient,
    capacity: Arc<CapacityCache>,
    gateway_shutdown: watch::Sender<bool>,
    background: Mutex<Vec<JoinHandle<()>>>,
    http_addr: String,
}

impl Node {
    /// Builds every durable store, signing/claims/wallet collaborator, the
    /// overlay transport, and the RPC dispatcher, wiring them together per
    /// [`HandlerContext`]'s seams. Does not yet bind any socket; call
    /// [`Node::start`] for that.
    pub async fn build(config: &ResolvedConfig, signing_seed: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

        let signer: Arc<dyn shardnet_api::signer::FarmerSigner> = Arc::new(
            LocalFarmerSigner::from_seed(signing_seed)
                .map_err(|e| anyhow::anyhow!("failed to derive node signing key: {e}"))?,
        );

        let claims = Arc::new(if config.claims_allow_list.iter().any(|k| k == "*") {
            AllowList {
                wildcard: true,
                allowed: Vec::new(),
            }
        } else {
            AllowList {
                wildcard: false,
                allowed: config
                    .claims_allow_list
                    .iter()
                    .filter_map(|hex_key| hex::decode(hex_key).ok())
                    .collect(),
            }
        });

        let wallet = Arc::new(LocalWallet);

        let contracts = Arc::new(
            RedbContractStore::open(config.data_dir.join("contracts.redb"))
                .map_err(|e| anyhow::anyhow!("opening contract store: {e}"))?,
        );

        let shards = Arc::new(
            FsShardStore::open(config.data_dir.join("shards"), u64::MAX)
                .await
                .map_err(|e| anyhow::anyhow!("opening shard store: {e}"))?,
        );

        let tokens = Arc::new(InMemoryTokenTable::new());
        let offer_streams = Arc::new(DashMap::new());

        let deferred_ingress = DeferredIngress::new();
        let identity_keypair = libp2p::identity::Keypair::generate_ed25519();
        let (overlay, overlay_handle, overlay_events) =
            Overlay::new(identity_keypair, deferred_ingress.clone())
                .context("starting overlay transport")?;

        let overlay_ping = Arc::new(LibP2pOverlayPing::new(overlay_handle.clone()));
        let mirror = Arc::new(HttpMirrorTransport::new());

        let ctx = Arc::new(HandlerContext {
            signer: signer.clone(),
            claims,
            wallet,
            contracts: contracts.clone(),
            shards,
            tokens: tokens.clone(),
            mirror,
            overlay: overlay_ping,
            offer_streams: offer_streams.clone(),
            token_ttl_ms: config.token_ttl_secs.saturating_mul(1000),
        });

        let rpc_handlers = Arc::new(RpcHandlers::new(ctx.clone()));
        deferred_ingress.resolve(rpc_handlers.clone());

        let local_contact = Contact {
            identity: signer.identity(),
            info: AddressInfo {
                multiaddr: format!("{}/p2p/{}", config.listen_addr, overlay_handle.local_peer_id()),
                http_base_url: format!("http://{}", config.http_addr),
                xpub: signer.hd_key(),
            },
        };

        let client = NodeClient {
            overlay: overlay_handle.clone(),
            signer: signer.clone(),
            contracts: contracts.clone(),
            offer_streams,
            local_contact,
        };

        let capacity = Arc::new(CapacityCache::new());
        let (gateway_shutdown, _) = watch::channel(false);

        let node = Self {
            ctx,
            overlay,
            overlay_handle,
            client,
            capacity,
            gateway_shutdown,
            background: Mutex::new(Vec::new()),
            http_addr: config.http_addr.clone(),
        };

        node.spawn_background_tasks(overlay_events);
        Ok(node)
    }

    /// This node's client-side verbs (publish/offer/renew/claim/...).
    pub fn client(&self) -> &NodeClient {
        &self.client
    }

    /// The renter-side capacity cache, updated from gossip.
    pub fn capacity_cache(&self) -> &Arc<CapacityCache> {
        &self.capacity
    }

    /// This node's identity.
    pub fn identity(&self) -> shardnet_types::contact::Identity {
        self.ctx.signer.identity()
    }

    fn spawn_background_tasks(&self, overlay_events: mpsc::Receiver<shardnet_networking::OverlayEvent>) {
        let mut handles = Vec::new();

        handles.push(tokio::spawn(actor::run(
            overlay_events,
            self.capacity.clone(),
        )));

        handles.push(tokio::spawn(sweep_loop(
            self.ctx.tokens.clone(),
            self.ctx.contracts.clone(),
        )));

        // Blocking `try_lock` here would be wrong inside an async
        // constructor; `spawn_background_tasks` runs synchronously right
        // after `Mutex::new(Vec::new())` so the lock is always uncontended.
        if let Ok(mut guard) = self.background.try_lock() {
            guard.extend(handles);
        }
    }

    /// Binds the overlay transport's listen address and the HTTP gateway,
    /// then returns once both are listening. Runs until [`Node::stop`] is
    /// called.
    pub async fn start(&self, listen_addr: &str, config: &ResolvedConfig) -> Result<()> {
        let multiaddr: libp2p::Multiaddr = listen_addr
            .parse()
            .with_context(|| format!("parsing listen_addr {listen_addr}"))?;
        self.overlay_handle.listen(multiaddr).await?;

        let gateway_config = shardnet_gateway::GatewayConfig {
            listen_addr: self.http_addr.clone(),
            rps: 50,
            burst: 100,
            body_limit_kb: 64 * 1024,
            trusted_proxies: config.trusted_proxy_cidrs.clone(),
        };

        let rpc: Arc<dyn RpcIngress> = Arc::new(RpcHandlers::new(self.ctx.clone()));
        let identity = self.ctx.signer.identity();
        let contact = self.client.local_contact.clone();
        let shards = self.ctx.shards.clone();
        let tokens = self.ctx.tokens.clone();
        let contracts = self.ctx.contracts.clone();
        let shutdown_rx = self.gateway_shutdown.subscribe();

        tokio::spawn(async move {
            if let Err(e) = shardnet_gateway::run_server(
                gateway_config,
                identity,
                contact,
                shards,
                tokens,
                contracts,
                rpc,
                shutdown_rx,
            )
            .await
            {
                tracing::error!(target: "node", error = %e, "gateway server exited with error");
            }
        });

        Ok(())
    }

    /// Signals the HTTP gateway and the overlay transport to stop, then
    /// joins every background task.
    pub async fn stop(&self) -> Result<()> {
        let _ = self.gateway_shutdown.send(true);
        self.overlay.shutdown().await;
        let mut handles = self.background.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        Ok(())
    }
}

/// Periodically sweeps expired tokens and reaps expired contracts, the two
/// janitorial loops this node's resource model calls for.
async fn sweep_loop(
    tokens: Arc<dyn shardnet_api::token_table::TokenTable>,
    contracts: Arc<dyn shardnet_api::contract_store::ContractStore>,
) {
    const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);
    const REAP_GRACE_MS: u64 = 24 * 60 * 60 * 1000;

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let now = HandlerContext::now_ms();
        let swept = tokens.sweep(now).await;
        if swept > 0 {
            tracing::debug!(target: "node", count = swept, "swept expired tokens");
        }
        match contracts.reapable(now, REAP_GRACE_MS).await {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = contracts.delete(&key).await {
                        tracing::warn!(target: "node", %key, error = %e, "failed to reap contract");
                    }
                }
            }
            Err(e) => tracing::warn!(target: "node", error = %e, "failed to list reapable contracts"),
        }
    }
}
