// Path: crates/networking/src/libp2p/mod.rs

//! A libp2p-based overlay transport for the eight RPC verbs and the two
//! gossip topic families (shard descriptors, farmer capacity).
//!
//! An actor shape: a swarm-driving task owns the `Swarm`, a command channel feeds it, an event
//! channel drains it), generalized from block/transaction sync to dispatching
//! [`shardnet_api::rpc_ingress::RpcIngress`] verbs over `request_response`
//! and forwarding gossipsub messages to the caller untouched.

pub mod codec;

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use libp2p::{
    gossipsub, identity, noise, ping,
    request_response::{self, ResponseChannel},
    swarm::{NetworkBehaviour, SwarmEvent},
    tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder, Transport,
};
use shardnet_api::rpc_ingress::RpcIngress;
use shardnet_api::HasErrorKind;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::metrics::metrics;
use crate::traits::OverlayError;

pub use self::codec::{RpcCodec, RpcErrorBody, RpcWireRequest, RpcWireResponse};

/// Pulls the dialable `PeerId` out of a `.../p2p/<peer-id>` multiaddr, the
/// form every [`shardnet_types::contact::AddressInfo::multiaddr`] is expected
/// to carry so the overlay never needs a separate identity-to-address
/// directory.
pub fn peer_id_from_multiaddr(addr: &Multiaddr) -> Option<PeerId> {
    addr.iter().find_map(|proto| match proto {
        libp2p::multiaddr::Protocol::P2p(peer_id) => Some(peer_id),
        _ => None,
    })
}

#[derive(NetworkBehaviour)]
#[behaviour(to_swarm = "OverlayBehaviourEvent")]
pub struct OverlayBehaviour {
    pub gossipsub: gossipsub::Behaviour,
    pub request_response: request_response::Behaviour<RpcCodec>,
    pub ping: ping::Behaviour,
}

#[derive(Debug)]
pub enum OverlayBehaviourEvent {
    Gossipsub(gossipsub::Event),
    RequestResponse(request_response::Event<RpcWireRequest, RpcWireResponse>),
    Ping(ping::Event),
}

impl From<gossipsub::Event> for OverlayBehaviourEvent {
    fn from(event: gossipsub::Event) -> Self {
        OverlayBehaviourEvent::Gossipsub(event)
    }
}

impl From<request_response::Event<RpcWireRequest, RpcWireResponse>> for OverlayBehaviourEvent {
    fn from(event: request_response::Event<RpcWireRequest, RpcWireResponse>) -> Self {
        OverlayBehaviourEvent::RequestResponse(event)
    }
}

impl From<ping::Event> for OverlayBehaviourEvent {
    fn from(event: ping::Event) -> Self {
        OverlayBehaviourEvent::Ping(event)
    }
}

/// Commands the swarm-driving task accepts from [`OverlayHandle`].
#[derive(Debug)]
pub enum OverlayCommand {
    /// Start listening on an address.
    Listen(Multiaddr),
    /// Registers `addr` as dialable for `peer` and dials it; `reply` resolves
    /// once the connection is established (or already was) or fails.
    Dial {
        peer: PeerId,
        addr: Multiaddr,
        reply: oneshot::Sender<Result<(), OverlayError>>,
    },
    /// Sends one RPC verb call to `peer`, already connected or dialable from
    /// a prior `Dial`.
    SendRpc {
        peer: PeerId,
        request: RpcWireRequest,
        reply: oneshot::Sender<Result<RpcWireResponse, OverlayError>>,
    },
    /// Publishes `payload` to a gossipsub topic.
    Publish { topic: String, payload: Vec<u8> },
    /// Subscribes to a gossipsub topic; subsequent messages on it arrive as
    /// [`OverlayEvent::GossipMessage`].
    Subscribe { topic: String },
}

/// Events the swarm-driving task forwards out for the node to observe.
#[derive(Debug)]
pub enum OverlayEvent {
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    GossipMessage {
        topic: String,
        payload: Vec<u8>,
        source: Option<PeerId>,
    },
}

/// A cheaply cloneable handle to a running overlay transport.
#[derive(Clone)]
pub struct OverlayHandle {
    command_sender: mpsc::Sender<OverlayCommand>,
    local_peer_id: PeerId,
}

impl OverlayHandle {
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    pub async fn listen(&self, addr: Multiaddr) -> Result<(), OverlayError> {
        self.command_sender
            .send(OverlayCommand::Listen(addr))
            .await
            .map_err(|_| OverlayError::Network("overlay task is gone".to_string()))
    }

    /// Ensures `peer` is dialable at `addr` and connected, within the
    /// request-response behaviour's own connection timeout.
    pub async fn dial(&self, peer: PeerId, addr: Multiaddr) -> Result<(), OverlayError> {
        let (reply, recv) = oneshot::channel();
        self.command_sender
            .send(OverlayCommand::Dial { peer, addr, reply })
            .await
            .map_err(|_| OverlayError::Network("overlay task is gone".to_string()))?;
        recv.await
            .map_err(|_| OverlayError::Internal("dial reply dropped".to_string()))?
    }

    pub async fn send_rpc(
        &self,
        peer: PeerId,
        request: RpcWireRequest,
    ) -> Result<RpcWireResponse, OverlayError> {
        let (reply, recv) = oneshot::channel();
        self.command_sender
            .send(OverlayCommand::SendRpc {
                peer,
                request,
                reply,
            })
            .await
            .map_err(|_| OverlayError::Network("overlay task is gone".to_string()))?;
        recv.await
            .map_err(|_| OverlayError::Internal("rpc reply dropped".to_string()))?
    }

    pub async fn publish(&self, topic: impl Into<String>, payload: Vec<u8>) -> Result<(), OverlayError> {
        self.command_sender
            .send(OverlayCommand::Publish {
                topic: topic.into(),
                payload,
            })
            .await
            .map_err(|_| OverlayError::Network("overlay task is gone".to_string()))
    }

    pub async fn subscribe(&self, topic: impl Into<String>) -> Result<(), OverlayError> {
        self.command_sender
            .send(OverlayCommand::Subscribe {
                topic: topic.into(),
            })
            .await
            .map_err(|_| OverlayError::Network("overlay task is gone".to_string()))
    }
}

/// Owns the swarm-driving task's lifetime; dropped (or [`Overlay::shutdown`])
/// stops it.
pub struct Overlay {
    shutdown_sender: watch::Sender<bool>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    local_peer_id: PeerId,
}

impl Overlay {
    /// Spawns the swarm-driving task and returns the owner, a command handle,
    /// and the event stream. `ingress` is the single dispatcher every inbound
    /// RPC request is handed to -- in practice `node`'s `RpcHandlers`.
    pub fn new(
        local_key: identity::Keypair,
        ingress: Arc<dyn RpcIngress>,
    ) -> anyhow::Result<(Arc<Self>, OverlayHandle, mpsc::Receiver<OverlayEvent>)> {
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let (command_sender, command_receiver) = mpsc::channel(256);
        let (event_sender, event_receiver) = mpsc::channel(256);
        let (inbound_done_tx, inbound_done_rx) = mpsc::channel(256);

        let local_peer_id = local_key.public().to_peer_id();
        let swarm = Self::build_swarm(local_key)?;

        let swarm_task = tokio::spawn(Self::run_swarm_loop(
            swarm,
            command_receiver,
            event_sender,
            inbound_done_tx,
            inbound_done_rx,
            ingress,
            shutdown_receiver,
        ));

        let overlay = Arc::new(Self {
            shutdown_sender,
            task_handles: Mutex::new(vec![swarm_task]),
            local_peer_id,
        });
        let handle = OverlayHandle {
            command_sender,
            local_peer_id,
        };
        Ok((overlay, handle, event_receiver))
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// Signals the swarm-driving task to stop and waits for it to exit.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_sender.send(true);
        let mut handles = self.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }

    fn build_swarm(local_key: identity::Keypair) -> anyhow::Result<Swarm<OverlayBehaviour>> {
        let swarm = SwarmBuilder::with_existing_identity(local_key)
            .with_tokio()
            .with_other_transport(|key| {
                let noise_config = noise::Config::new(key)?;
                let transport = tcp::tokio::Transport::new(tcp::Config::default())
                    .upgrade(libp2p::core::upgrade::Version::V1Lazy)
                    .authenticate(noise_config)
                    .multiplex(yamux::Config::default())
                    .timeout(Duration::from_secs(20))
                    .boxed();
                Ok(transport)
            })?
            .with_behaviour(|key| {
                let gossipsub = gossipsub::Behaviour::new(
                    gossipsub::MessageAuthenticity::Signed(key.clone()),
                    gossipsub::Config::default(),
                )?;
                let cfg = request_response::Config::default()
                    .with_request_timeout(Duration::from_secs(30));
                let request_response = request_response::Behaviour::new(
                    std::iter::once(("/shardnet/rpc/1", request_response::ProtocolSupport::Full)),
                    cfg,
                );
                let ping = ping::Behaviour::new(ping::Config::new());
                Ok(OverlayBehaviour {
                    gossipsub,
                    request_response,
                    ping,
                })
            })?
            .build();
        Ok(swarm)
    }

    async fn run_swarm_loop(
        mut swarm: Swarm<OverlayBehaviour>,
        mut command_receiver: mpsc::Receiver<OverlayCommand>,
        event_sender: mpsc::Sender<OverlayEvent>,
        inbound_done_tx: mpsc::Sender<(ResponseChannel<RpcWireResponse>, RpcWireResponse)>,
        mut inbound_done_rx: mpsc::Receiver<(ResponseChannel<RpcWireResponse>, RpcWireResponse)>,
        ingress: Arc<dyn RpcIngress>,
        mut shutdown_receiver: watch::Receiver<bool>,
    ) {
        let mut topic_names: HashMap<gossipsub::TopicHash, String> = HashMap::new();
        let mut pending_rpc: HashMap<
            request_response::RequestId,
            oneshot::Sender<Result<RpcWireResponse, OverlayError>>,
        > = HashMap::new();
        let mut pending_dials: HashMap<PeerId, Vec<oneshot::Sender<Result<(), OverlayError>>>> =
            HashMap::new();

        loop {
            tokio::select! {
                _ = shutdown_receiver.changed() => if *shutdown_receiver.borrow() { break; },
                Some((channel, response)) = inbound_done_rx.recv() => {
                    swarm.behaviour_mut().request_response.send_response(channel, response).ok();
                }
                event = swarm.select_next_some() => match event {
                    SwarmEvent::NewListenAddr { address, .. } => {
                        tracing::info!(target: "overlay", event = "listening", %address);
                    }
                    SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                        metrics().inc_connected_peers();
                        if let Some(waiters) = pending_dials.remove(&peer_id) {
                            for waiter in waiters {
                                waiter.send(Ok(())).ok();
                            }
                        }
                        event_sender.send(OverlayEvent::PeerConnected(peer_id)).await.ok();
                    }
                    SwarmEvent::ConnectionClosed { peer_id, .. } => {
                        metrics().dec_connected_peers();
                        event_sender.send(OverlayEvent::PeerDisconnected(peer_id)).await.ok();
                    }
                    SwarmEvent::OutgoingConnectionError { peer_id: Some(peer_id), error, .. } => {
                        tracing::debug!(target: "overlay", %peer_id, %error, event = "dial_failed");
                        if let Some(waiters) = pending_dials.remove(&peer_id) {
                            for waiter in waiters {
                                waiter.send(Err(OverlayError::Network(error.to_string()))).ok();
                            }
                        }
                    }
                    SwarmEvent::Behaviour(event) => match event {
                        OverlayBehaviourEvent::Gossipsub(gossipsub::Event::Message { message, propagation_source, .. }) => {
                            let topic_name = topic_names
                                .get(&message.topic)
                                .cloned()
                                .unwrap_or_else(|| message.topic.to_string());
                            metrics().inc_gossip_messages_received(&topic_name);
                            event_sender.send(OverlayEvent::GossipMessage {
                                topic: topic_name,
                                payload: message.data,
                                source: message.source.or(Some(propagation_source)),
                            }).await.ok();
                        }
                        OverlayBehaviourEvent::RequestResponse(request_response::Event::Message { message, .. }) => match message {
                            request_response::Message::Request { request, channel, .. } => {
                                let ingress = ingress.clone();
                                let done = inbound_done_tx.clone();
                                tokio::spawn(async move {
                                    let response = dispatch_inbound(ingress, request).await;
                                    done.send((channel, response)).await.ok();
                                });
                            }
                            request_response::Message::Response { request_id, response } => {
                                if let Some(reply) = pending_rpc.remove(&request_id) {
                                    reply.send(Ok(response)).ok();
                                }
                            }
                        },
                        OverlayBehaviourEvent::RequestResponse(request_response::Event::OutboundFailure { request_id, error, peer, .. }) => {
                            tracing::warn!(target: "overlay", %peer, %error, event = "rpc_outbound_failure");
                            if let Some(reply) = pending_rpc.remove(&request_id) {
                                reply.send(Err(OverlayError::Network(error.to_string()))).ok();
                            }
                        }
                        OverlayBehaviourEvent::RequestResponse(request_response::Event::InboundFailure { peer, error, .. }) => {
                            tracing::warn!(target: "overlay", %peer, %error, event = "rpc_inbound_failure");
                        }
                        OverlayBehaviourEvent::RequestResponse(_) => {}
                        OverlayBehaviourEvent::Ping(_) => {}
                    },
                    _ => {}
                },
                command = command_receiver.recv() => match command {
                    Some(OverlayCommand::Listen(addr)) => { swarm.listen_on(addr).ok(); }
                    Some(OverlayCommand::Dial { peer, addr, reply }) => {
                        if swarm.is_connected(&peer) {
                            reply.send(Ok(())).ok();
                        } else {
                            swarm.behaviour_mut().request_response.add_address(&peer, addr.clone());
                            if let Err(e) = swarm.dial(addr) {
                                reply.send(Err(OverlayError::Network(e.to_string()))).ok();
                            } else {
                                pending_dials.entry(peer).or_default().push(reply);
                            }
                        }
                    }
                    Some(OverlayCommand::SendRpc { peer, request, reply }) => {
                        let request_id = swarm.behaviour_mut().request_response.send_request(&peer, request);
                        pending_rpc.insert(request_id, reply);
                    }
                    Some(OverlayCommand::Publish { topic, payload }) => {
                        let ident = gossipsub::IdentTopic::new(topic.clone());
                        topic_names.insert(ident.hash(), topic.clone());
                        if let Err(e) = swarm.behaviour_mut().gossipsub.publish(ident, payload) {
                            tracing::warn!(target: "overlay", error = %e, %topic, event = "publish_failed");
                        }
                    }
                    Some(OverlayCommand::Subscribe { topic }) => {
                        let ident = gossipsub::IdentTopic::new(topic.clone());
                        topic_names.insert(ident.hash(), topic.clone());
                        if let Err(e) = swarm.behaviour_mut().gossipsub.subscribe(&ident) {
                            tracing::warn!(target: "overlay", error = %e, %topic, event = "subscribe_failed");
                        }
                    }
                    None => return,
                }
            }
        }
    }
}

/// Runs one inbound RPC request through `ingress` and builds the wire reply,
/// off the swarm-driving task so a slow handler never stalls the event loop.
async fn dispatch_inbound(ingress: Arc<dyn RpcIngress>, request: RpcWireRequest) -> RpcWireResponse {
    let params: serde_json::Value = match serde_json::from_slice(&request.params_json) {
        Ok(v) => v,
        Err(e) => {
            return RpcWireResponse {
                verb: request.verb,
                result: Err(RpcErrorBody {
                    kind_label: "validation".to_string(),
                    message: format!("malformed params: {e}"),
                }),
            };
        }
    };
    match ingress.dispatch(&request.verb, params, request.caller).await {
        Ok(value) => {
            let bytes = serde_json::to_vec(&value).unwrap_or_default();
            RpcWireResponse {
                verb: request.verb,
                result: Ok(bytes),
            }
        }
        Err(e) => RpcWireResponse {
            verb: request.verb,
            result: Err(RpcErrorBody {
                kind_label: e.kind().as_label().to_string(),
                message: e.message,
            }),
        },
    }
}
