// Path: crates/rpc/src/handlers/renew.rs
//! RENEW: a renter proposes an extension of an existing contract -- a new
//! validity window and audit commitment, signed on the renter side -- which
//! this farmer either co-signs or rejects outright on the first
//! impermissible field it finds.

use serde::{Deserialize, Serialize};
use shardnet_types::contact::Contact;
use shardnet_types::contract::{Contract, Role, RENEWABLE_FIELDS};
use shardnet_types::error::ErrorKind;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Deserialize)]
pub struct RenewParams {
    /// The renter's proposed renewal, with `renter_signature` freshly set
    /// and `farmer_signature` left empty.
    pub contract: Contract,
}

#[derive(Debug, Serialize)]
pub struct RenewResult {
    /// The farmer-signed, persisted renewal.
    pub contract: Contract,
}

pub async fn handle(
    ctx: &HandlerContext,
    caller: Contact,
    params: RenewParams,
) -> Result<RenewResult, RpcError> {
    let mut renewal = params.contract;

    let signer = ctx.signer.clone();
    if !renewal.is_valid_with(|key, idx, message, sig| signer.verify_child(key, idx, message, sig)) {
        return Err(RpcError::validation("malformed renewal descriptor"));
    }

    let key = shardnet_api::contract_store::contract_key(&renewal.data_hash_hex(), caller.xpub());
    let local = ctx
        .contracts
        .get(&key)
        .await?
        .ok_or_else(|| RpcError::new(ErrorKind::NotFound, "no existing contract to renew"))?;

    // The farmer hasn't signed the renewal yet; comparing the old farmer
    // signature against the renewal's (always-empty) one would always flag
    // FarmerSignature as an illegal diff, so both sides are blanked before
    // comparison.
    let mut local_cmp = local.clone();
    local_cmp.farmer_signature = None;
    let mut renewal_cmp = renewal.clone();
    renewal_cmp.farmer_signature = None;

    let diff = Contract::diff(&local_cmp, &renewal_cmp);
    if let Some(field) = Contract::first_disallowed_diff(&diff, RENEWABLE_FIELDS) {
        return Err(RpcError::validation(format!(
            "Rejecting renewal of {field}"
        )));
    }

    let farmer_index = local.farmer_hd_index;
    renewal.farmer_id = local.farmer_id;
    renewal.farmer_hd_key = local.farmer_hd_key.clone();
    renewal.farmer_hd_index = farmer_index;

    let signer = ctx.signer.clone();
    renewal.sign_with(Role::Farmer, |message| signer.sign_child(farmer_index, message));

    ctx.contracts.put(&key, &renewal).await?;

    Ok(RenewResult { contract: renewal })
}
