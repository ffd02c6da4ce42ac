// Path: crates/node/src/ping.rs
//! The concrete [`OverlayPing`]: PROBE's liveness check, implemented as a
//! dial attempt against the caller's own advertised multiaddr over the
//! overlay transport.

use async_trait::async_trait;
use shardnet_networking::{peer_id_from_multiaddr, OverlayHandle};
use shardnet_rpc::context::OverlayPing;
use shardnet_rpc::error::RpcError;
use shardnet_types::contact::Contact;
use shardnet_types::error::ErrorKind;

/// Wraps a running overlay's [`OverlayHandle`] as PROBE's liveness check.
pub struct LibP2pOverlayPing {
    handle: OverlayHandle,
}

impl LibP2pOverlayPing {
    pub fn new(handle: OverlayHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl OverlayPing for LibP2pOverlayPing {
    async fn ping(&self, target: &Contact) -> Result<(), RpcError> {
        let addr: libp2p::Multiaddr = target
            .info
            .multiaddr
            .parse()
            .map_err(|e| RpcError::new(ErrorKind::Upstream, format!("bad multiaddr: {e}")))?;
        let peer_id = peer_id_from_multiaddr(&addr).ok_or_else(|| {
            RpcError::new(
                ErrorKind::Upstream,
                "multiaddr does not carry a /p2p/ peer id",
            )
        })?;
        self.handle
            .dial(peer_id, addr)
            .await
            .map_err(|e| RpcError::new(ErrorKind::Upstream, format!("dial failed: {e}")))
    }
}
