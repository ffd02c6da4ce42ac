//! Handler-level tests for the eight overlay RPC verbs, covering the
//! testable properties and end-to-end scenarios (S1-S6) against real
//! `shardnet-storage` backends and the fakes in `tests/common`.

mod common;

use common::{complete_contract, half_signed_claim, renter_contact, Fixture};
use shardnet_api::claims::AllowList;
use shardnet_api::contract_store::{contract_key, ContractStore};
use shardnet_api::shard_store::ShardStore;
use shardnet_api::token_table::TokenTable;
use shardnet_rpc::handlers::{audit, claim, consign, mirror, offer, probe, renew, retrieve};
use shardnet_types::contact::{AddressInfo, Contact, Identity};
use shardnet_types::contract::Role;
use shardnet_types::error::{ErrorKind, HasErrorKind};
use tokio::io::AsyncWriteExt;

fn farmer_contact() -> Contact {
    Contact {
        identity: Identity([2u8; 20]),
        info: AddressInfo {
            multiaddr: "/ip4/127.0.0.1/tcp/4002".into(),
            http_base_url: "http://127.0.0.1:8081".into(),
            xpub: vec![8u8; 33],
        },
    }
}

async fn store_shard(fx: &Fixture, hash_hex: &str, bytes: &[u8]) {
    let mut w = fx.ctx.shards.create_write_stream(hash_hex).await.expect("write stream");
    w.write_all(bytes).await.expect("write");
    w.shutdown().await.expect("shutdown");
    drop(w);
    fx.ctx.shards.commit(hash_hex).await.expect("commit");
}

// --- S1: AUDIT happy path ---

#[tokio::test]
async fn s1_audit_happy_path() {
    let fx = Fixture::new().await;
    let shard_bytes = b"this is a test shard";
    let salts = [[0x11u8; 32], [0x22u8; 32]];
    let (leaves, challenges) = shardnet_proof::build_audit_commitment(shard_bytes, &salts);

    let mut contract = complete_contract([0xAA; 20], 0, 1_000_000_000_000);
    contract.audit_leaves = leaves;
    // re-sign now that audit_leaves changed the preimage
    common::fake_sign(&mut contract, Role::Renter);
    common::fake_sign(&mut contract, Role::Farmer);

    let hash_hex = contract.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &contract).await.expect("seed contract");
    store_shard(&fx, &hash_hex, shard_bytes).await;

    let params = audit::AuditParams {
        items: vec![audit::AuditChallenge {
            data_hash_hex: hash_hex.clone(),
            challenge: challenges[0].clone(),
        }],
    };
    let result = audit::handle(&fx.ctx, renter_contact(), params).await.expect("audit");
    assert_eq!(result.items.len(), 1);
    let proof = result.items[0].proof.as_ref().expect("proof present");

    let root = shardnet_proof::compute_root(&[shardnet_proof::salted_prehash(&salts[0], shard_bytes), shardnet_proof::salted_prehash(&salts[1], shard_bytes)])
        .expect("root");
    let reconstructed = shardnet_proof::AuditProof {
        leaf: {
            let mut out = [0u8; 32];
            out.copy_from_slice(&hex::decode(&proof.leaf_hex).unwrap());
            out
        },
        index: proof.index,
        depth: proof.depth,
        siblings: proof
            .siblings_hex
            .iter()
            .map(|s| {
                let mut out = [0u8; 32];
                out.copy_from_slice(&hex::decode(s).unwrap());
                out
            })
            .collect(),
    };
    let (expected, computed) = shardnet_proof::verify(&reconstructed, root, reconstructed.depth);
    assert_eq!(expected, computed);
}

// Property 2: AUDIT is total, preserves order, and never fails as a whole.

#[tokio::test]
async fn audit_batch_is_total_and_ordered_with_missing_items() {
    let fx = Fixture::new().await;
    let shard_bytes = b"present shard bytes";
    let salts = [[0x44u8; 32]];
    let (leaves, challenges) = shardnet_proof::build_audit_commitment(shard_bytes, &salts);

    let mut present = complete_contract([0xBB; 20], 0, 1_000_000_000_000);
    present.audit_leaves = leaves;
    common::fake_sign(&mut present, Role::Renter);
    common::fake_sign(&mut present, Role::Farmer);
    let present_hash = present.data_hash_hex();
    let key = contract_key(&present_hash, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &present).await.expect("seed");
    store_shard(&fx, &present_hash, shard_bytes).await;

    let missing_hash_hex = hex::encode([0xCCu8; 20]);

    let params = audit::AuditParams {
        items: vec![
            audit::AuditChallenge {
                data_hash_hex: missing_hash_hex.clone(),
                challenge: "0:1111".to_string(),
            },
            audit::AuditChallenge {
                data_hash_hex: present_hash.clone(),
                challenge: challenges[0].clone(),
            },
        ],
    };
    let result = audit::handle(&fx.ctx, renter_contact(), params).await.expect("audit never fails");
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].data_hash_hex, missing_hash_hex);
    assert!(result.items[0].proof.is_none());
    assert_eq!(result.items[1].data_hash_hex, present_hash);
    assert!(result.items[1].proof.is_some());
}

// --- S2: expired contract CONSIGN ---

#[tokio::test]
async fn s2_consign_fails_on_expired_contract() {
    let fx = Fixture::new().await;
    let contract = complete_contract([0x01; 20], 0, 0);
    let hash_hex = contract.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &contract).await.expect("seed");

    let err = consign::handle(
        &fx.ctx,
        renter_contact(),
        consign::ConsignParams { data_hash_hex: hash_hex },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);
    assert_eq!(err.message, "Contract has expired");
}

#[tokio::test]
async fn consign_mints_token_for_live_contract() {
    let fx = Fixture::new().await;
    let contract = complete_contract([0x02; 20], 0, 9_999_999_999_999);
    let hash_hex = contract.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &contract).await.expect("seed");

    let result = consign::handle(
        &fx.ctx,
        renter_contact(),
        consign::ConsignParams { data_hash_hex: hash_hex.clone() },
    )
    .await
    .expect("consign");
    assert!(!result.token.is_empty());
    let record = fx
        .ctx
        .tokens
        .authorize(&result.token, &hash_hex, 0)
        .await
        .expect("token authorized");
    assert_eq!(record.hash_hex, hash_hex);
}

#[tokio::test]
async fn consign_without_contract_is_not_found() {
    let fx = Fixture::new().await;
    let err = consign::handle(
        &fx.ctx,
        renter_contact(),
        consign::ConsignParams {
            data_hash_hex: hex::encode([0xEE; 20]),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn retrieve_without_contract_is_not_found() {
    let fx = Fixture::new().await;
    let err = retrieve::handle(
        &fx.ctx,
        renter_contact(),
        retrieve::RetrieveParams {
            data_hash_hex: hex::encode([0xFF; 20]),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// Property 5: RETRIEVE fails with "Shard not found" iff the caller holds a
// contract for the hash but the shard itself is absent.

#[tokio::test]
async fn retrieve_fails_when_shard_absent() {
    let fx = Fixture::new().await;
    let contract = complete_contract([0x03; 20], 0, 9_999_999_999_999);
    let hash_hex = contract.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &contract).await.expect("seed");

    let err = retrieve::handle(
        &fx.ctx,
        renter_contact(),
        retrieve::RetrieveParams { data_hash_hex: hash_hex },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn retrieve_mints_token_when_shard_present() {
    let fx = Fixture::new().await;
    let contract = complete_contract([0x03; 20], 0, 9_999_999_999_999);
    let hash_hex = contract.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &contract).await.expect("seed");
    store_shard(&fx, &hash_hex, b"shard bytes").await;

    let result = retrieve::handle(
        &fx.ctx,
        renter_contact(),
        retrieve::RetrieveParams { data_hash_hex: hash_hex.clone() },
    )
    .await
    .expect("retrieve");
    assert!(!result.token.is_empty());
}

// --- S3: RENEW rejects a disallowed field ---

#[tokio::test]
async fn s3_renew_rejects_disallowed_field() {
    let fx = Fixture::new().await;
    let local = complete_contract([0x04; 20], 0, 10_000);
    let hash_hex = local.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &local).await.expect("seed");

    let mut renewal = local.clone();
    renewal.farmer_hd_key = vec![0x77; 33];
    renewal.farmer_signature = None;
    common::fake_sign(&mut renewal, Role::Renter);

    let err = renew::handle(&fx.ctx, renter_contact(), renew::RenewParams { contract: renewal })
        .await
        .unwrap_err();
    assert_eq!(err.message, "Rejecting renewal of farmer_hd_key");
}

#[tokio::test]
async fn renew_accepts_allowed_field_changes_and_persists() {
    let fx = Fixture::new().await;
    let local = complete_contract([0x05; 20], 0, 10_000);
    let hash_hex = local.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &local).await.expect("seed");

    let mut renewal = local.clone();
    renewal.store_begin = 5_000;
    renewal.store_end = 50_000;
    renewal.farmer_signature = None;
    common::fake_sign(&mut renewal, Role::Renter);

    let result = renew::handle(&fx.ctx, renter_contact(), renew::RenewParams { contract: renewal })
        .await
        .expect("renew");
    assert_eq!(result.contract.store_end, 50_000);
    assert!(result.contract.is_complete());

    let persisted = fx.ctx.contracts.get(&key).await.expect("get").expect("present");
    assert_eq!(persisted.store_end, 50_000);
}

#[tokio::test]
async fn renew_without_existing_contract_is_not_found() {
    let fx = Fixture::new().await;
    let renewal = complete_contract([0x06; 20], 0, 10_000);
    let err = renew::handle(&fx.ctx, renter_contact(), renew::RenewParams { contract: renewal })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// --- S5: CLAIM by a renter not on the allow-list ---

#[tokio::test]
async fn s5_claim_rejects_unknown_renter() {
    let fx = Fixture::with_claims(AllowList::default()).await;
    let descriptor = half_signed_claim([0x07; 20], 2048);

    let err = claim::handle(&fx.ctx, renter_contact(), claim::ClaimParams { contract: descriptor })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let key = contract_key(&hex::encode([0x07u8; 20]), renter_contact().xpub());
    assert!(fx.ctx.contracts.get(&key).await.expect("get").is_none());
}

// CLAIM success: the renter already knows this (deterministic, single-farmer
// test) signer's next allocated index and the fake wallet's deterministic
// payment destination, so its pre-signature survives the farmer's field
// fill-in untouched -- the same preimage both sides end up agreeing on.
#[tokio::test]
async fn claim_fills_and_signs_for_allowed_renter() {
    let fx = Fixture::new().await;
    let mut descriptor = half_signed_claim([0x08; 20], 4096);
    descriptor.farmer_id = [2u8; 20];
    descriptor.farmer_hd_key = vec![8u8; 33];
    descriptor.farmer_hd_index = 0;
    descriptor.payment_destination = format!("wallet:{}", hex::encode([2u8; 20]));
    common::fake_sign(&mut descriptor, Role::Renter);

    let result = claim::handle(&fx.ctx, renter_contact(), claim::ClaimParams { contract: descriptor })
        .await
        .expect("claim");
    assert!(result.contract.is_complete());
    assert!(!result.token.is_empty());

    let key = contract_key(&result.contract.data_hash_hex(), renter_contact().xpub());
    let persisted = fx.ctx.contracts.get(&key).await.expect("get").expect("present");
    assert_eq!(persisted.farmer_hd_index, 0);
}

// --- MIRROR ---

#[tokio::test]
async fn mirror_without_contract_is_not_found() {
    let fx = Fixture::new().await;
    let err = mirror::handle(
        &fx.ctx,
        renter_contact(),
        mirror::MirrorParams {
            data_hash_hex: hex::encode([0x09u8; 20]),
            token: "tok".into(),
            destination: farmer_contact(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn mirror_pushes_shard_and_returns_ack() {
    let fx = Fixture::new().await;
    let contract = complete_contract([0x09; 20], 0, 9_999_999_999_999);
    let hash_hex = contract.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &contract).await.expect("seed");
    store_shard(&fx, &hash_hex, b"mirrored bytes").await;

    let result = mirror::handle(
        &fx.ctx,
        renter_contact(),
        mirror::MirrorParams {
            data_hash_hex: hash_hex.clone(),
            token: "tok".into(),
            destination: farmer_contact(),
        },
    )
    .await
    .expect("mirror");
    assert_eq!(result["ack"], hash_hex);
}

#[tokio::test]
async fn mirror_fails_when_shard_missing() {
    let fx = Fixture::new().await;
    let contract = complete_contract([0x0A; 20], 0, 9_999_999_999_999);
    let hash_hex = contract.data_hash_hex();
    let key = contract_key(&hash_hex, renter_contact().xpub());
    fx.ctx.contracts.put(&key, &contract).await.expect("seed");

    let err = mirror::handle(
        &fx.ctx,
        renter_contact(),
        mirror::MirrorParams {
            data_hash_hex: hash_hex,
            token: "tok".into(),
            destination: farmer_contact(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// --- PROBE ---

#[tokio::test]
async fn probe_succeeds_when_overlay_reachable() {
    let fx = Fixture::new().await;
    probe::handle(&fx.ctx, renter_contact()).await.expect("probe");
}

// --- OFFER ---

#[tokio::test]
async fn offer_rejects_when_no_stream_is_open() {
    let fx = Fixture::new().await;
    let offered = complete_contract([0x0B; 20], 0, 10_000);
    let err = offer::handle(&fx.ctx, farmer_contact(), offer::OfferParams { contract: offered })
        .await
        .unwrap_err();
    assert_eq!(err.message, "Offers for descriptor are closed");
}

#[tokio::test]
async fn offer_queues_and_resolves_against_open_stream() {
    let fx = Fixture::new().await;
    let owning = complete_contract([0x0C; 20], 0, 10_000);
    let data_hash = owning.data_hash;

    let verifier: shardnet_offer::Verifier = std::sync::Arc::new(|_, _, _, sig: &Vec<u8>| {
        // mirrors FakeSigner::verify_child's trivial identity scheme
        !sig.is_empty()
    });
    let (stream, mut consumer) = shardnet_offer::open(owning, shardnet_api::offer::OfferOptions::default(), verifier);
    fx.ctx.offer_streams.insert(data_hash, stream);

    let offered = complete_contract([0x0C; 20], 0, 10_000);
    let offered_for_consumer = offered.clone();

    let consumer_task = tokio::spawn(async move {
        let admitted = consumer.next().await.expect("admitted");
        admitted.resolve(Ok(offered_for_consumer)).await;
    });

    let result = offer::handle(&fx.ctx, farmer_contact(), offer::OfferParams { contract: offered })
        .await
        .expect("offer resolved");
    assert_eq!(result.contract.data_hash, data_hash);
    consumer_task.await.expect("consumer task");
}
