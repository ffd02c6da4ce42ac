// Path: crates/node/src/client.rs
//! The Node's client-side verbs: each wraps a
//! transport send and post-processes the reply. Every verb but
//! `identifyService` goes out over the overlay transport's `request_response`
//! behaviour; `identifyService` is the one unauthenticated HTTP handshake a
//! node makes before it knows a peer well enough to address it as a `PeerId`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use shardnet_api::contract_store::{contract_key, ContractStore};
use shardnet_api::offer::OfferOptions;
use shardnet_api::signer::FarmerSigner;
use shardnet_networking::{peer_id_from_multiaddr, OverlayHandle};
use shardnet_offer::OfferStream;
use shardnet_rpc::context::OfferRegistry;
use shardnet_rpc::handlers::audit::{AuditChallenge, AuditItemResult, AuditParams, AuditResult};
use shardnet_rpc::handlers::claim::{ClaimParams, ClaimResult};
use shardnet_rpc::handlers::consign::{ConsignParams, ConsignResult};
use shardnet_rpc::handlers::mirror::MirrorParams;
use shardnet_rpc::handlers::offer::OfferParams;
use shardnet_rpc::handlers::renew::{RenewParams, RenewResult};
use shardnet_rpc::handlers::retrieve::{RetrieveParams, RetrieveResult};
use shardnet_types::contact::Contact;
use shardnet_types::contract::{Contract, HdKey, Role, Signature};
use thiserror::Error;

use crate::capacity::{capacity_topic, CapacityAnnouncement};

/// Errors a client-side call can fail with: transport failure, a malformed
/// reply, or the remote peer's own `RpcError` echoed back over the wire.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("peer contact does not carry a dialable /p2p/ multiaddr")]
    UnroutableContact,
    #[error("overlay transport error: {0}")]
    Overlay(#[from] shardnet_networking::OverlayError),
    #[error("malformed reply: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("remote returned {kind}: {message}")]
    Remote { kind: String, message: String },
    #[error("local contract store error: {0}")]
    Store(#[from] shardnet_api::contract_store::ContractError),
}

fn contact_peer_id(peer: &Contact) -> Result<(libp2p::PeerId, libp2p::Multiaddr), ClientError> {
    let addr: libp2p::Multiaddr = peer
        .info
        .multiaddr
        .parse()
        .map_err(|_| ClientError::UnroutableContact)?;
    let peer_id = peer_id_from_multiaddr(&addr).ok_or(ClientError::UnroutableContact)?;
    Ok((peer_id, addr))
}

/// Everything a client-side verb needs: the overlay handle to send over, the
/// signer to stamp this node's own half of a descriptor, the local contract
/// store to persist replies into, the offer registry `publishShardDescriptor`
/// registers into, and the `Contact` this node presents as itself.
pub struct NodeClient {
    pub overlay: OverlayHandle,
    pub signer: Arc<dyn FarmerSigner>,
    pub contracts: Arc<dyn ContractStore>,
    pub offer_streams: Arc<OfferRegistry>,
    pub local_contact: Contact,
}

impl NodeClient {
    async fn send_verb<P: Serialize, R: DeserializeOwned>(
        &self,
        peer: &Contact,
        verb: &str,
        params: P,
    ) -> Result<R, ClientError> {
        let (peer_id, addr) = contact_peer_id(peer)?;
        self.overlay.dial(peer_id, addr).await?;

        let params_json = serde_json::to_vec(&params)?;
        let request = shardnet_networking::RpcWireRequest {
            verb: verb.to_string(),
            params_json,
            caller: self.local_contact.clone(),
        };
        let response = self.overlay.send_rpc(peer_id, request).await?;
        match response.result {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(body) => Err(ClientError::Remote {
                kind: body.kind_label,
                message: body.message,
            }),
        }
    }

    /// Fetches a peer's identity and contact over the unauthenticated
    /// handshake route, the one call this crate makes over plain HTTP
    /// instead of the overlay transport.
    pub async fn identify_service(&self, url: &str) -> Result<(String, Contact), ClientError> {
        let base = url.trim_end_matches('/');
        let response = reqwest::get(base)
            .await
            .map_err(|e| ClientError::Remote {
                kind: "upstream".to_string(),
                message: e.to_string(),
            })?;
        let (identity_hex, contact): (String, Contact) =
            response.json().await.map_err(|e| ClientError::Remote {
                kind: "upstream".to_string(),
                message: e.to_string(),
            })?;
        Ok((identity_hex, contact))
    }

    /// Signs `contract` as renter, registers an OfferStream under its
    /// `data_hash`, and broadcasts it on the descriptor topic derived from
    /// the contract's size/duration bucket. Admitted offers are accepted
    /// outright: choosing *which* admitted offer to prefer is a renter
    /// acceptance policy left to an external collaborator, so this node
    /// defaults to first-admitted-wins
    /// (already enforced by `OfferStream`'s own `max_offers` admission
    /// policy) rather than inventing one.
    pub async fn publish_shard_descriptor(
        &self,
        mut contract: Contract,
        options: OfferOptions,
    ) -> Result<OfferStream, ClientError> {
        let identity = self.signer.identity();
        let index = self.signer.allocate_hd_index();
        contract.renter_id = identity.0;
        contract.renter_hd_key = self.signer.hd_key();
        contract.renter_hd_index = index;

        let signer = self.signer.clone();
        contract.sign_with(Role::Renter, |message| signer.sign_child(index, message));

        let verify_signer = self.signer.clone();
        let verify: shardnet_offer::Verifier = Arc::new(
            move |key: &HdKey, idx: u32, message: &[u8], sig: &Signature| {
                verify_signer.verify_child(key, idx, message, sig)
            },
        );

        let (stream, mut consumer) = shardnet_offer::open(contract.clone(), options, verify);
        self.offer_streams
            .insert(contract.data_hash, stream.clone());

        tokio::spawn(async move {
            while let Some(admitted) = consumer.next().await {
                let outcome = Ok(admitted.contract.clone());
                admitted.resolve(outcome).await;
            }
        });

        let topic = format!("0f{}", contract.topic_string());
        let payload = serde_json::to_vec(&contract).unwrap_or_default();
        self.overlay.subscribe(topic.clone()).await?;
        self.overlay.publish(topic, payload).await?;

        Ok(stream)
    }

    /// Announces this farmer's available/allocated capacity on the capacity
    /// topic its size bucket maps to.
    pub async fn announce_capacity(&self, available: u64, allocated: u64) -> Result<(), ClientError> {
        let announcement = CapacityAnnouncement {
            farmer_id: self.signer.identity(),
            contact: self.local_contact.clone(),
            available,
            allocated,
        };
        let topic = capacity_topic(available);
        let payload = serde_json::to_vec(&announcement)?;
        self.overlay.subscribe(topic.clone()).await?;
        self.overlay.publish(topic, payload).await?;
        Ok(())
    }

    /// Sends OFFER to `peer` (a renter's node) with a farmer-signed
    /// descriptor, persisting the finalized reply under `{hash}:{peer.xpub}`.
    pub async fn offer_shard_allocation(
        &self,
        peer: &Contact,
        descriptor: Contract,
    ) -> Result<Contract, ClientError> {
        let result: shardnet_rpc::handlers::offer::OfferResult = self
            .send_verb(peer, "OFFER", OfferParams { contract: descriptor })
            .await?;
        let key = contract_key(&result.contract.data_hash_hex(), peer.xpub());
        self.contracts.put(&key, &result.contract).await?;
        Ok(result.contract)
    }

    /// Sends RENEW to `peer` (the farmer of an existing contract). Only the
    /// reply itself is persisted -- there is no array of candidate renewals
    /// to pick from.
    pub async fn request_contract_renewal(
        &self,
        peer: &Contact,
        descriptor: Contract,
    ) -> Result<Contract, ClientError> {
        let result: RenewResult = self
            .send_verb(peer, "RENEW", RenewParams { contract: descriptor })
            .await?;
        let key = contract_key(&result.contract.data_hash_hex(), peer.xpub());
        self.contracts.put(&key, &result.contract).await?;
        Ok(result.contract)
    }

    /// Authorizes an upload for each hash in `hashes`, one CONSIGN per hash.
    pub async fn authorize_consignment(
        &self,
        peer: &Contact,
        hashes: &[String],
    ) -> Result<Vec<String>, ClientError> {
        let mut tokens = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let result: ConsignResult = self
                .send_verb(
                    peer,
                    "CONSIGN",
                    ConsignParams {
                        data_hash_hex: hash.clone(),
                    },
                )
                .await?;
            tokens.push(result.token);
        }
        Ok(tokens)
    }

    /// Authorizes a download for each hash in `hashes`, one RETRIEVE per hash.
    pub async fn authorize_retrieval(
        &self,
        peer: &Contact,
        hashes: &[String],
    ) -> Result<Vec<String>, ClientError> {
        let mut tokens = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let result: RetrieveResult = self
                .send_verb(
                    peer,
                    "RETRIEVE",
                    RetrieveParams {
                        data_hash_hex: hash.clone(),
                    },
                )
                .await?;
            tokens.push(result.token);
        }
        Ok(tokens)
    }

    /// Asks `peer` (a farmer holding the shard) to mirror it to `destination`,
    /// authorized by a token already issued at `destination`.
    pub async fn create_shard_mirror(
        &self,
        peer: &Contact,
        data_hash_hex: &str,
        token: &str,
        destination: Contact,
    ) -> Result<serde_json::Value, ClientError> {
        self.send_verb(
            peer,
            "MIRROR",
            MirrorParams {
                data_hash_hex: data_hash_hex.to_string(),
                token: token.to_string(),
                destination,
            },
        )
        .await
    }

    /// Sends an ordered batch of audit challenges to `peer`.
    pub async fn audit_remote_shards(
        &self,
        peer: &Contact,
        audits: Vec<AuditChallenge>,
    ) -> Result<Vec<AuditItemResult>, ClientError> {
        let result: AuditResult = self
            .send_verb(peer, "AUDIT", AuditParams { items: audits })
            .await?;
        Ok(result.items)
    }

    /// Sends CLAIM to `peer` (a farmer), persisting the co-signed contract
    /// and returning it alongside the single-use upload token it grants.
    pub async fn claim_farmer_capacity(
        &self,
        peer: &Contact,
        descriptor: Contract,
    ) -> Result<(Contract, String), ClientError> {
        let result: ClaimResult = self
            .send_verb(peer, "CLAIM", ClaimParams { contract: descriptor })
            .await?;
        let key = contract_key(&result.contract.data_hash_hex(), peer.xpub());
        self.contracts.put(&key, &result.contract).await?;
        Ok((result.contract, result.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_peer_id_rejects_addr_without_p2p_suffix() {
        let contact = Contact {
            identity: shardnet_types::contact::Identity([0u8; 20]),
            info: shardnet_types::contact::AddressInfo {
                multiaddr: "/ip4/127.0.0.1/tcp/4001".to_string(),
                http_base_url: "http://127.0.0.1:8080".to_string(),
                xpub: vec![],
            },
        };
        assert!(contact_peer_id(&contact).is_err());
    }
}
