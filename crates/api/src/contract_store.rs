// Path: crates/api/src/contract_store.rs
//! The `ContractStore` trait: a durable key-value store keyed by
//! `"{data_hash}:{counterparty_hd_key}"`, holding at most one [`Contract`] per
//! `(shard, counterparty)` pair.

use async_trait::async_trait;
use shardnet_types::contract::Contract;
use thiserror::Error;

use crate::ErrorKind;

/// Errors raised by a `ContractStore` implementation.
#[derive(Debug, Error)]
pub enum ContractError {
    /// No contract exists under the requested key.
    #[error("no contract for key {0}")]
    NotFound(String),
    /// The backing store rejected the read or write.
    #[error("contract store backend error: {0}")]
    Backend(String),
    /// A contract failed to encode or decode for persistence.
    #[error("contract codec error: {0}")]
    Codec(String),
}

impl crate::HasErrorKind for ContractError {
    fn kind(&self) -> ErrorKind {
        match self {
            ContractError::NotFound(_) => ErrorKind::NotFound,
            ContractError::Backend(_) | ContractError::Codec(_) => ErrorKind::Upstream,
        }
    }
}

/// Builds the composite contract store key `"{data_hash}:{counterparty_hd_key}"`.
pub fn contract_key(data_hash_hex: &str, counterparty_hd_key: &[u8]) -> String {
    format!("{}:{}", data_hash_hex, hex::encode(counterparty_hd_key))
}

/// A durable, content-addressed store of storage contracts.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Looks up the contract at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Contract>, ContractError>;

    /// Inserts or overwrites the contract at `key`. Callers are expected to
    /// have already checked `is_valid_with`/`is_complete` — the store itself
    /// does not re-validate.
    async fn put(&self, key: &str, contract: &Contract) -> Result<(), ContractError>;

    /// Removes the contract at `key`, if present. Idempotent.
    async fn delete(&self, key: &str) -> Result<(), ContractError>;

    /// Iterates contract keys whose `store_end` has passed `now_ms` by more
    /// than the reap grace margin, for the periodic reap sweep.
    async fn reapable(&self, now_ms: u64, grace_ms: u64) -> Result<Vec<String>, ContractError>;
}
