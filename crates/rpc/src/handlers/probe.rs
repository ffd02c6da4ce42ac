// Path: crates/rpc/src/handlers/probe.rs
//! PROBE: a liveness check. The caller is pinged back over the overlay
//! transport; an empty reply confirms this node could reach them.

use serde::Serialize;
use shardnet_types::contact::Contact;
use shardnet_types::error::ErrorKind;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Serialize)]
pub struct ProbeResult {}

pub async fn handle(ctx: &HandlerContext, caller: Contact) -> Result<ProbeResult, RpcError> {
    ctx.overlay.ping(&caller).await.map_err(|_| {
        RpcError::new(ErrorKind::Upstream, "failed to reach probe originator")
    })?;
    Ok(ProbeResult {})
}
