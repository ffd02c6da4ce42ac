// Path: crates/rpc/src/handlers/consign.rs
//! CONSIGN: the renter side of a claimed contract asks the farmer to
//! authorize the shard upload the contract promises, minting a single-use
//! transfer token iff the contract is still live.

use serde::{Deserialize, Serialize};
use shardnet_types::contact::Contact;
use shardnet_types::error::ErrorKind;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Deserialize)]
pub struct ConsignParams {
    /// Lowercase-hex content address of the shard the caller wants to upload.
    pub data_hash_hex: String,
}

#[derive(Debug, Serialize)]
pub struct ConsignResult {
    /// A single-use upload authorization token for `POST /shards/{hash}`.
    pub token: String,
}

pub async fn handle(
    ctx: &HandlerContext,
    caller: Contact,
    params: ConsignParams,
) -> Result<ConsignResult, RpcError> {
    let key = shardnet_api::contract_store::contract_key(&params.data_hash_hex, caller.xpub());
    let contract = ctx
        .contracts
        .get(&key)
        .await?
        .ok_or_else(|| RpcError::new(ErrorKind::NotFound, "no contract found for this shard"))?;

    let now = HandlerContext::now_ms();
    if now > contract.store_end {
        return Err(RpcError::new(ErrorKind::Expired, "Contract has expired"));
    }

    let token = HandlerContext::mint_token();
    ctx.tokens
        .accept(&token, &params.data_hash_hex, caller, now + ctx.token_ttl_ms)
        .await;

    Ok(ConsignResult { token })
}
