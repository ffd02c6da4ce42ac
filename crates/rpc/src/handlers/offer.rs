// Path: crates/rpc/src/handlers/offer.rs
//! OFFER: a farmer proposes filling a renter's open descriptor. Looked up by
//! `data_hash` against the node's live [`shardnet_offer::OfferStream`]
//! registry and queued onto it; the reply is whatever the renter-side
//! consumer eventually resolves the offer with.

use serde::{Deserialize, Serialize};
use shardnet_types::contact::Contact;
use shardnet_types::contract::Contract;
use tokio::sync::oneshot;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Deserialize)]
pub struct OfferParams {
    /// The farmer-signed descriptor offered in fulfillment of the open stream.
    pub contract: Contract,
}

#[derive(Debug, Serialize)]
pub struct OfferResult {
    /// The finalized descriptor the renter resolved the offer with.
    pub contract: Contract,
}

pub async fn handle(
    ctx: &HandlerContext,
    caller: Contact,
    params: OfferParams,
) -> Result<OfferResult, RpcError> {
    let stream = ctx
        .offer_streams
        .get(&params.contract.data_hash)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| {
            RpcError::from(shardnet_api::offer::OfferError::NoSuchStream)
        })?;

    let (tx, rx) = oneshot::channel();
    stream
        .queue(
            caller,
            params.contract,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        )
        .await;

    let outcome = rx.await.map_err(|_| {
        RpcError::new(
            shardnet_types::error::ErrorKind::Upstream,
            "offer stream closed before it resolved this offer",
        )
    })?;
    let contract = outcome?;
    Ok(OfferResult { contract })
}
