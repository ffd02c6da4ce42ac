//! Shared fakes and fixtures for the handler-level scenario tests in
//! `tests/scenarios.rs`. Signing here is a trivial identity scheme (a
//! "signature" is just the signed message itself) rather than real HD/ECDSA
//! cryptography -- `Contract::is_valid_with`/`sign_with` are generic over the
//! verify/sign closures precisely so this crate's tests never need a real
//! signature primitive to exercise the handlers' own logic.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use shardnet_api::claims::AllowList;
use shardnet_api::signer::FarmerSigner;
use shardnet_api::wallet::{WalletError, WalletIntegration};
use shardnet_rpc::context::{HandlerContext, MirrorTransport, OfferRegistry, OverlayPing};
use shardnet_rpc::error::RpcError;
use shardnet_storage::contract_store::RedbContractStore;
use shardnet_storage::shard_store::FsShardStore;
use shardnet_storage::token_table::InMemoryTokenTable;
use shardnet_types::contact::{AddressInfo, Contact, Identity};
use shardnet_types::contract::{Contract, HdKey, Role, Signature};

/// A trivial "signer": signatures are just the preimage itself, and
/// `verify_child` accepts any signature equal to the message it was asked to
/// verify, regardless of `key`/`index`. This lets tests build both
/// renter-signed and farmer-signed descriptors without a real HD scheme.
pub struct FakeSigner {
    identity: Identity,
    hd_key: HdKey,
    next_index: AtomicU32,
}

impl FakeSigner {
    pub fn new(identity: [u8; 20], hd_key: Vec<u8>) -> Self {
        Self {
            identity: Identity(identity),
            hd_key,
            next_index: AtomicU32::new(0),
        }
    }
}

impl FarmerSigner for FakeSigner {
    fn identity(&self) -> Identity {
        self.identity
    }

    fn hd_key(&self) -> HdKey {
        self.hd_key.clone()
    }

    fn allocate_hd_index(&self) -> u32 {
        self.next_index.fetch_add(1, Ordering::SeqCst)
    }

    fn sign_child(&self, _index: u32, message: &[u8]) -> Signature {
        message.to_vec()
    }

    fn verify_child(&self, _xpub: &HdKey, _index: u32, message: &[u8], signature: &Signature) -> bool {
        signature.as_slice() == message
    }
}

/// Signs `contract` as `role` using the identity scheme [`FakeSigner`] checks.
pub fn fake_sign(contract: &mut Contract, role: Role) {
    contract.sign_with(role, |message| message.to_vec());
}

/// A `WalletIntegration` that always mints the same deterministic address.
pub struct FakeWallet;

impl WalletIntegration for FakeWallet {
    fn mint_payment_destination(&self, farmer_id: &Identity) -> Result<String, WalletError> {
        Ok(format!("wallet:{}", farmer_id.to_hex()))
    }
}

/// A `MirrorTransport` that records its last call and returns a canned ack.
pub struct FakeMirror {
    pub fail: bool,
}

#[async_trait]
impl MirrorTransport for FakeMirror {
    async fn push(
        &self,
        hash_hex: &str,
        _token: &str,
        _destination: &Contact,
        _shard: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
    ) -> Result<serde_json::Value, RpcError> {
        if self.fail {
            return Err(RpcError::new(
                shardnet_types::error::ErrorKind::Upstream,
                "mirror push failed",
            ));
        }
        Ok(serde_json::json!({ "ack": hash_hex }))
    }
}

/// An `OverlayPing` whose success/failure is fixed at construction.
pub struct FakeOverlay {
    pub reachable: bool,
}

#[async_trait]
impl OverlayPing for FakeOverlay {
    async fn ping(&self, _target: &Contact) -> Result<(), RpcError> {
        if self.reachable {
            Ok(())
        } else {
            Err(RpcError::new(shardnet_types::error::ErrorKind::Upstream, "unreachable"))
        }
    }
}

/// Builds a `HandlerContext` wired with real `shardnet-storage` backends
/// (rooted at fresh temp paths) and the fakes above, wildcard claims policy,
/// and a 30-minute token TTL (the default).
pub struct Fixture {
    pub ctx: Arc<HandlerContext>,
    _dir: tempfile::TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_claims(AllowList {
            wildcard: true,
            allowed: vec![],
        })
        .await
    }

    pub async fn with_claims(claims: AllowList) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let contracts = RedbContractStore::open(dir.path().join("contracts.redb")).expect("open contracts");
        let shards = FsShardStore::open(dir.path().join("shards"), 10_000_000)
            .await
            .expect("open shards");
        let tokens = InMemoryTokenTable::new();

        let ctx = HandlerContext {
            signer: Arc::new(FakeSigner::new([2u8; 20], vec![8u8; 33])),
            claims: Arc::new(claims),
            wallet: Arc::new(FakeWallet),
            contracts: Arc::new(contracts),
            shards: Arc::new(shards),
            tokens: Arc::new(tokens),
            mirror: Arc::new(FakeMirror { fail: false }),
            overlay: Arc::new(FakeOverlay { reachable: true }),
            offer_streams: Arc::new(OfferRegistry::new()),
            token_ttl_ms: 30 * 60 * 1000,
        };

        Self { ctx: Arc::new(ctx), _dir: dir }
    }
}

/// The renter's contact envelope used across the scenario tests.
pub fn renter_contact() -> Contact {
    Contact {
        identity: Identity([1u8; 20]),
        info: AddressInfo {
            multiaddr: "/ip4/127.0.0.1/tcp/4001".into(),
            http_base_url: "http://127.0.0.1:8080".into(),
            xpub: vec![9u8; 33],
        },
    }
}

/// A half-signed descriptor a renter would send in a CLAIM: renter fields
/// filled and signed, farmer fields still blank.
pub fn half_signed_claim(data_hash: [u8; 20], data_size: u64) -> Contract {
    let mut c = Contract {
        data_hash,
        data_size,
        renter_id: [1u8; 20],
        farmer_id: [0u8; 20],
        renter_hd_key: vec![9u8; 33],
        farmer_hd_key: vec![],
        renter_hd_index: 0,
        farmer_hd_index: 0,
        renter_signature: None,
        farmer_signature: None,
        store_begin: 1_000,
        store_end: 2_000,
        audit_leaves: vec![[0u8; 32]],
        payment_destination: String::new(),
        version: 1,
    };
    fake_sign(&mut c, Role::Renter);
    c
}

/// A fully signed, complete descriptor, as would be persisted after a
/// successful CLAIM -- used as the seed local contract for CONSIGN/
/// RETRIEVE/AUDIT/RENEW tests.
pub fn complete_contract(data_hash: [u8; 20], store_begin: u64, store_end: u64) -> Contract {
    let mut c = Contract {
        data_hash,
        data_size: 1024,
        renter_id: [1u8; 20],
        farmer_id: [2u8; 20],
        renter_hd_key: vec![9u8; 33],
        farmer_hd_key: vec![8u8; 33],
        renter_hd_index: 0,
        farmer_hd_index: 0,
        renter_signature: None,
        farmer_signature: None,
        store_begin,
        store_end,
        audit_leaves: vec![[0u8; 32]],
        payment_destination: "wallet:dest".into(),
        version: 1,
    };
    fake_sign(&mut c, Role::Renter);
    fake_sign(&mut c, Role::Farmer);
    c
}
