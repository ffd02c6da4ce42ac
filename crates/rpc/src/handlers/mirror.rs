// Path: crates/rpc/src/handlers/mirror.rs
//! MIRROR: pushes a locally held shard to another node's gateway, on behalf
//! of a caller who holds a contract for this shard with this farmer and
//! already holds (or minted) a valid transfer token for the destination.

use serde::{Deserialize, Serialize};
use shardnet_types::contact::Contact;
use shardnet_types::error::ErrorKind;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Deserialize)]
pub struct MirrorParams {
    /// Lowercase-hex content address of the shard to mirror.
    pub data_hash_hex: String,
    /// The upload token already authorized at `destination`.
    pub token: String,
    /// Where to push the shard to.
    pub destination: Contact,
}

pub async fn handle(
    ctx: &HandlerContext,
    caller: Contact,
    params: MirrorParams,
) -> Result<serde_json::Value, RpcError> {
    let key = shardnet_api::contract_store::contract_key(&params.data_hash_hex, caller.xpub());
    ctx.contracts
        .get(&key)
        .await?
        .ok_or_else(|| RpcError::new(ErrorKind::NotFound, "no contract found for this shard"))?;

    let reader = ctx.shards.create_read_stream(&params.data_hash_hex).await?;
    ctx.mirror
        .push(
            &params.data_hash_hex,
            &params.token,
            &params.destination,
            reader,
        )
        .await
}
