// Path: crates/node/src/actor.rs
//! The node's own single background actor: drains [`OverlayEvent`]s off the
//! overlay transport, folding capacity-topic gossip into the
//! [`CapacityCache`] and logging peer connect/disconnect churn. This is the
//! single actor task layered on top of the already-concurrency-safe durable
//! stores.

use std::sync::Arc;

use shardnet_networking::OverlayEvent;
use tokio::sync::mpsc;

use crate::capacity::{CapacityAnnouncement, CapacityCache, CAPACITY_TOPIC_PREFIX};

/// Runs until `overlay_events` closes (i.e. the overlay transport shut down).
pub async fn run(mut overlay_events: mpsc::Receiver<OverlayEvent>, capacity: Arc<CapacityCache>) {
    while let Some(event) = overlay_events.recv().await {
        match event {
            OverlayEvent::GossipMessage { topic, payload, source } => {
                if let Some(code) = topic.strip_prefix(CAPACITY_TOPIC_PREFIX) {
                    handle_capacity_gossip(&capacity, code, &payload, source);
                }
            }
            OverlayEvent::PeerConnected(peer_id) => {
                tracing::debug!(target: "node", %peer_id, "overlay peer connected");
            }
            OverlayEvent::PeerDisconnected(peer_id) => {
                tracing::debug!(target: "node", %peer_id, "overlay peer disconnected");
            }
        }
    }
}

fn handle_capacity_gossip(
    capacity: &CapacityCache,
    _topic_code: &str,
    payload: &[u8],
    source: Option<libp2p::PeerId>,
) {
    match serde_json::from_slice::<CapacityAnnouncement>(payload) {
        Ok(announcement) => {
            capacity.record(announcement, shardnet_rpc::context::HandlerContext::now_ms());
        }
        Err(e) => {
            tracing::debug!(
                target: "node",
                source = ?source,
                error = %e,
                "discarding malformed capacity announcement"
            );
        }
    }
}
