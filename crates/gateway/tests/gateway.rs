//! Integration tests for the shard-transfer HTTP surface: upload/download
//! gated by `TokenTable`, a hash-mismatch rejection scenario, and single-use
//! token semantics.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;
use shardnet_api::contract_store::{contract_key, ContractStore};
use shardnet_api::rpc_ingress::{RpcIngress, RpcIngressError};
use shardnet_api::shard_store::ShardStore;
use shardnet_api::token_table::TokenTable;
use shardnet_crypto::algorithms::content_hash::data_hash;
use shardnet_gateway::{run_server, GatewayConfig};
use shardnet_storage::contract_store::RedbContractStore;
use shardnet_storage::shard_store::FsShardStore;
use shardnet_storage::token_table::InMemoryTokenTable;
use shardnet_types::contact::{AddressInfo, Contact, Identity};
use shardnet_types::contract::Contract;
use tokio::sync::watch;

/// No RPC verbs are exercised here; the `/rpc/` route always errors.
struct UnusedRpc;

#[async_trait]
impl RpcIngress for UnusedRpc {
    async fn dispatch(&self, verb: &str, _params: Value, _caller: Contact) -> Result<Value, RpcIngressError> {
        Err(RpcIngressError::new(
            shardnet_api::ErrorKind::Validation,
            format!("unknown verb {verb}"),
        ))
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
}

fn renter_contact() -> Contact {
    Contact {
        identity: Identity([1u8; 20]),
        info: AddressInfo {
            multiaddr: "/ip4/127.0.0.1/tcp/4001".into(),
            http_base_url: "http://127.0.0.1:0".into(),
            xpub: vec![9u8; 33],
        },
    }
}

fn contract_for(hash: [u8; 20], data_size: u64) -> Contract {
    Contract {
        data_hash: hash,
        data_size,
        renter_id: [1u8; 20],
        farmer_id: [2u8; 20],
        renter_hd_key: vec![9u8; 33],
        farmer_hd_key: vec![8u8; 33],
        renter_hd_index: 0,
        farmer_hd_index: 0,
        renter_signature: Some(b"r".to_vec()),
        farmer_signature: Some(b"f".to_vec()),
        store_begin: 0,
        store_end: now_ms() + 1_000_000,
        audit_leaves: vec![[0u8; 32]],
        payment_destination: "wallet:1".into(),
        version: 1,
    }
}

struct Harness {
    base_url: String,
    tokens: Arc<InMemoryTokenTable>,
    contracts: Arc<RedbContractStore>,
    shards: Arc<FsShardStore>,
    shutdown: watch::Sender<bool>,
    _dir: tempfile::TempDir,
}

async fn spawn_gateway() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let contracts = Arc::new(RedbContractStore::open(dir.path().join("contracts.redb")).unwrap());
    let shards = Arc::new(FsShardStore::open(dir.path().join("shards"), 10_000_000).await.unwrap());
    let tokens = Arc::new(InMemoryTokenTable::new());

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let listen_addr = format!("127.0.0.1:{port}");
    let base_url = format!("http://{listen_addr}");

    let (tx, rx) = watch::channel(false);

    let config = GatewayConfig {
        listen_addr: listen_addr.clone(),
        rps: 1_000,
        burst: 1_000,
        body_limit_kb: 1024,
        trusted_proxies: vec![],
    };

    let identity = Identity([2u8; 20]);
    let contact = renter_contact();

    let contracts_clone = contracts.clone();
    let shards_clone = shards.clone();
    let tokens_clone = tokens.clone();
    tokio::spawn(async move {
        run_server(
            config,
            identity,
            contact,
            shards_clone,
            tokens_clone,
            contracts_clone,
            Arc::new(UnusedRpc),
            rx,
        )
        .await
        .unwrap();
    });

    // Give the listener a moment to bind before the first request lands.
    for _ in 0..100 {
        if reqwest::get(&base_url).await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    Harness {
        base_url,
        tokens,
        contracts,
        shards,
        shutdown: tx,
        _dir: dir,
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[tokio::test]
async fn identify_handshake_returns_identity_and_contact() {
    let h = spawn_gateway().await;
    let resp = reqwest::get(&h.base_url).await.unwrap();
    assert_eq!(resp.status(), 200);
    let (identity_hex, contact): (String, Contact) = resp.json().await.unwrap();
    assert_eq!(identity_hex, Identity([2u8; 20]).to_hex());
    assert_eq!(contact.identity, Identity([1u8; 20]));
}

#[tokio::test]
async fn upload_accepted_when_hash_matches_and_token_live() {
    let h = spawn_gateway().await;
    let bytes = b"this is a test shard".to_vec();
    let hash_hex = hex::encode(data_hash(&bytes));
    let key = contract_key(&hash_hex, renter_contact().xpub());
    h.contracts.put(&key, &contract_for(data_hash(&bytes), bytes.len() as u64)).await.unwrap();

    let token = "a".repeat(64);
    h.tokens.accept(&token, &hash_hex, renter_contact(), now_ms() + 60_000).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/shards/{}?token={}", h.base_url, hash_hex, token))
        .body(bytes.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Property 8/9: the token is single-use -- a second upload attempt is unauthorized.
    let resp2 = client
        .post(format!("{}/shards/{}?token={}", h.base_url, hash_hex, token))
        .body(bytes)
        .send()
        .await
        .unwrap();
    assert_eq!(resp2.status(), 401);
}

#[tokio::test]
async fn s4_upload_hash_mismatch_is_rejected_and_shard_not_persisted() {
    let h = spawn_gateway().await;
    let real_bytes = b"this is a test shard".to_vec();
    let hash_hex = hex::encode(data_hash(&real_bytes));
    let key = contract_key(&hash_hex, renter_contact().xpub());
    h.contracts
        .put(&key, &contract_for(data_hash(&real_bytes), real_bytes.len() as u64))
        .await
        .unwrap();

    let token = "b".repeat(64);
    h.tokens.accept(&token, &hash_hex, renter_contact(), now_ms() + 60_000).await;

    let wrong_bytes = b"not the right shard bytes at all".to_vec();
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/shards/{}?token={}", h.base_url, hash_hex, token))
        .body(wrong_bytes)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Hash does not match"));

    assert!(!h.shards.exists(&hash_hex).await.unwrap());
}

#[tokio::test]
async fn upload_rejected_when_size_exceeds_contract_data_size() {
    let h = spawn_gateway().await;
    let bytes = b"0123456789".to_vec();
    let hash_hex = hex::encode(data_hash(&bytes));
    let key = contract_key(&hash_hex, renter_contact().xpub());
    // Declared data_size smaller than the actual payload.
    h.contracts.put(&key, &contract_for(data_hash(&bytes), 4)).await.unwrap();

    let token = "c".repeat(64);
    h.tokens.accept(&token, &hash_hex, renter_contact(), now_ms() + 60_000).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/shards/{}?token={}", h.base_url, hash_hex, token))
        .body(bytes)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(!h.shards.exists(&hash_hex).await.unwrap());
}

#[tokio::test]
async fn upload_without_token_is_unauthorized() {
    let h = spawn_gateway().await;
    let bytes = b"abc".to_vec();
    let hash_hex = hex::encode(data_hash(&bytes));

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/shards/{}?token=deadbeef", h.base_url, hash_hex))
        .body(bytes)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn download_missing_shard_is_not_found() {
    let h = spawn_gateway().await;
    let hash_hex = "a".repeat(40);
    let token = "d".repeat(64);
    h.tokens.accept(&token, &hash_hex, renter_contact(), now_ms() + 60_000).await;

    let resp = reqwest::get(format!("{}/shards/{}?token={}", h.base_url, hash_hex, token))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn download_round_trips_uploaded_bytes_and_revokes_token() {
    let h = spawn_gateway().await;
    let bytes = b"round trip shard payload".to_vec();
    let hash_hex = hex::encode(data_hash(&bytes));
    let key = contract_key(&hash_hex, renter_contact().xpub());
    h.contracts.put(&key, &contract_for(data_hash(&bytes), bytes.len() as u64)).await.unwrap();

    let upload_token = "e".repeat(64);
    h.tokens.accept(&upload_token, &hash_hex, renter_contact(), now_ms() + 60_000).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/shards/{}?token={}", h.base_url, hash_hex, upload_token))
        .body(bytes.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let download_token = "f".repeat(64);
    h.tokens.accept(&download_token, &hash_hex, renter_contact(), now_ms() + 60_000).await;
    let resp = reqwest::get(format!(
        "{}/shards/{}?token={}",
        h.base_url, hash_hex, download_token
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), bytes.as_slice());

    // Single-use: a second download with the same token is unauthorized.
    let resp2 = reqwest::get(format!(
        "{}/shards/{}?token={}",
        h.base_url, hash_hex, download_token
    ))
    .await
    .unwrap();
    assert_eq!(resp2.status(), 401);
}

#[tokio::test]
async fn unsupported_method_on_shards_path_is_405() {
    let h = spawn_gateway().await;
    let client = reqwest::Client::new();
    let resp = client
        .delete(format!("{}/shards/{}", h.base_url, "a".repeat(40)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
}

#[tokio::test]
async fn cors_preflight_is_permissive() {
    let h = spawn_gateway().await;
    let client = reqwest::Client::new();
    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{}/shards/{}", h.base_url, "a".repeat(40)))
        .header("Origin", "https://example.test")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
