// Path: crates/rpc/src/handlers/claim.rs
//! CLAIM: a renter asks this farmer to fill in and co-sign a half-signed
//! descriptor, claiming a slice of its advertised capacity.

use serde::{Deserialize, Serialize};
use shardnet_types::contact::Contact;
use shardnet_types::contract::Role;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Deserialize)]
pub struct ClaimParams {
    /// The renter's half-signed descriptor (only `renter_*` fields and
    /// `renter_signature` populated).
    pub contract: shardnet_types::contract::Contract,
}

#[derive(Debug, Serialize)]
pub struct ClaimResult {
    /// The fully signed, persisted descriptor.
    pub contract: shardnet_types::contract::Contract,
    /// A single-use authorization token for the first shard transfer this
    /// contract permits (the renter's upload, per CONSIGN).
    pub token: String,
}

pub async fn handle(
    ctx: &HandlerContext,
    caller: Contact,
    mut params: ClaimParams,
) -> Result<ClaimResult, RpcError> {
    if !ctx.claims.is_allowed(&params.contract.renter_hd_key) {
        return Err(RpcError::new(
            shardnet_types::error::ErrorKind::Unauthorized,
            "Currently rejecting claims",
        ));
    }

    let identity = ctx.signer.identity();
    let hd_key = ctx.signer.hd_key();
    let index = ctx.signer.allocate_hd_index();
    let payment_destination = ctx.wallet.mint_payment_destination(&identity)?;

    params.contract.farmer_id = identity.0;
    params.contract.farmer_hd_key = hd_key;
    params.contract.farmer_hd_index = index;
    params.contract.payment_destination = payment_destination;

    let signer = ctx.signer.clone();
    params
        .contract
        .sign_with(Role::Farmer, |message| signer.sign_child(index, message));

    let signer = ctx.signer.clone();
    if !params.contract.is_complete()
        || !params
            .contract
            .is_valid_with(|key, idx, message, sig| signer.verify_child(key, idx, message, sig))
    {
        return Err(RpcError::validation(
            "claimed descriptor is not valid and complete",
        ));
    }

    let key = shardnet_api::contract_store::contract_key(
        &params.contract.data_hash_hex(),
        caller.xpub(),
    );
    ctx.contracts.put(&key, &params.contract).await?;

    let token = HandlerContext::mint_token();
    let now = HandlerContext::now_ms();
    ctx.tokens
        .accept(
            &token,
            &params.contract.data_hash_hex(),
            caller,
            now + ctx.token_ttl_ms,
        )
        .await;

    Ok(ClaimResult {
        contract: params.contract,
        token,
    })
}
