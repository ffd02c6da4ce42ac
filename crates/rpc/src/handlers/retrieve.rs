// Path: crates/rpc/src/handlers/retrieve.rs
//! RETRIEVE: authorizes a shard download, minting a single-use transfer
//! token iff the caller holds a contract for this shard and the shard is
//! actually present.

use serde::{Deserialize, Serialize};
use shardnet_types::contact::Contact;
use shardnet_types::error::ErrorKind;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
    /// Lowercase-hex content address of the shard the caller wants to download.
    pub data_hash_hex: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResult {
    /// A single-use download authorization token for `GET /shards/{hash}`.
    pub token: String,
}

pub async fn handle(
    ctx: &HandlerContext,
    caller: Contact,
    params: RetrieveParams,
) -> Result<RetrieveResult, RpcError> {
    let key = shardnet_api::contract_store::contract_key(&params.data_hash_hex, caller.xpub());
    ctx.contracts
        .get(&key)
        .await?
        .ok_or_else(|| RpcError::new(ErrorKind::NotFound, "no contract found for this shard"))?;

    if !ctx.shards.exists(&params.data_hash_hex).await? {
        return Err(RpcError::new(ErrorKind::NotFound, "shard not found"));
    }

    let now = HandlerContext::now_ms();
    let token = HandlerContext::mint_token();
    ctx.tokens
        .accept(&token, &params.data_hash_hex, caller, now + ctx.token_ttl_ms)
        .await;

    Ok(RetrieveResult { token })
}
