// Path: crates/rpc/src/handlers/audit.rs
//! AUDIT: proves liveness of an ordered batch of shards against
//! previously-published challenges. This handler never fails as a whole --
//! a missing contract, missing shard, or
//! failed proof for one item becomes `proof: null` for that item alone, and
//! processing continues in order for the rest of the batch.

use serde::{Deserialize, Serialize};
use shardnet_types::contact::Contact;

use crate::context::HandlerContext;
use crate::error::RpcError;

#[derive(Debug, Deserialize)]
pub struct AuditChallenge {
    /// Lowercase-hex content address of the shard being challenged.
    pub data_hash_hex: String,
    /// The `"{index}:{salt_hex}"` challenge string naming a published leaf.
    pub challenge: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditParams {
    /// The ordered batch of challenges, processed sequentially.
    pub items: Vec<AuditChallenge>,
}

#[derive(Debug, Serialize)]
pub struct AuditItemResult {
    /// Echoes the challenged shard's hash.
    pub data_hash_hex: String,
    /// The compact inclusion proof, or `None` if the contract, shard, or
    /// proof itself could not be produced for this item.
    pub proof: Option<CompactProof>,
}

/// The wire shape of [`shardnet_proof::tree::AuditProof`], hex-encoded for
/// JSON transport.
#[derive(Debug, Serialize)]
pub struct CompactProof {
    /// Hex-encoded leaf payload.
    pub leaf_hex: String,
    /// The challenged leaf's position.
    pub index: u32,
    /// Tree height / number of siblings.
    pub depth: u32,
    /// Hex-encoded sibling hashes, bottom-up.
    pub siblings_hex: Vec<String>,
}

impl From<shardnet_proof::tree::AuditProof> for CompactProof {
    fn from(p: shardnet_proof::tree::AuditProof) -> Self {
        Self {
            leaf_hex: hex::encode(p.leaf),
            index: p.index,
            depth: p.depth,
            siblings_hex: p.siblings.iter().map(hex::encode).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditResult {
    /// One result per requested item, in the same order as `items`.
    pub items: Vec<AuditItemResult>,
}

pub async fn handle(
    ctx: &HandlerContext,
    caller: Contact,
    params: AuditParams,
) -> Result<AuditResult, RpcError> {
    let mut results = Vec::with_capacity(params.items.len());
    for item in params.items {
        let proof = prove_one(ctx, &caller, &item).await;
        results.push(AuditItemResult {
            data_hash_hex: item.data_hash_hex,
            proof,
        });
    }
    Ok(AuditResult { items: results })
}

async fn prove_one(
    ctx: &HandlerContext,
    caller: &Contact,
    item: &AuditChallenge,
) -> Option<CompactProof> {
    let key = shardnet_api::contract_store::contract_key(&item.data_hash_hex, caller.xpub());
    let contract = ctx.contracts.get(&key).await.ok().flatten()?;
    let reader = ctx
        .shards
        .create_read_stream(&item.data_hash_hex)
        .await
        .ok()?;
    let proof = shardnet_proof::prove(&contract.audit_leaves, &item.challenge, reader)
        .await
        .ok()?;
    Some(proof.into())
}
