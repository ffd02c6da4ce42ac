// Path: crates/rpc/src/error.rs
//! `RpcError`: the single error enum every verb handler returns, carrying a
//! human-readable message surfaced verbatim to the caller plus an
//! [`ErrorKind`] used to pick a transport-level shape (HTTP status on the
//! gateway ingress route, RPC error on a future overlay transport binding).
//!
//! A handful of `thiserror` variants, each wrapping a `String` message,
//! compose via `From` with every component error this crate's handlers
//! call into.

use shardnet_api::contract_store::ContractError;
use shardnet_api::offer::OfferError;
use shardnet_api::shard_store::ShardStoreError;
use shardnet_api::token_table::TokenError;
use shardnet_api::wallet::WalletError;
use shardnet_proof::ProofError;
use shardnet_types::error::{ErrorKind, HasErrorKind};
use thiserror::Error;

/// An error raised by one of the eight verb handlers.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct RpcError {
    /// Human-readable message. Every kind but [`ErrorKind::Auditable`] is
    /// surfaced to the caller verbatim.
    pub message: String,
    kind: ErrorKind,
}

impl RpcError {
    /// Builds an error with an explicit kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// A [`ErrorKind::Validation`] error, the common case for malformed or
    /// incomplete descriptors.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
}

impl HasErrorKind for RpcError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ContractError> for RpcError {
    fn from(e: ContractError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<ShardStoreError> for RpcError {
    fn from(e: ShardStoreError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<TokenError> for RpcError {
    fn from(e: TokenError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<OfferError> for RpcError {
    fn from(e: OfferError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<WalletError> for RpcError {
    fn from(e: WalletError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

/// `ProofError`s never reach an `RpcError` in practice -- AUDIT catches them
/// per-item and encodes `proof: null` instead -- but the conversion exists so
/// a `?` in shared plumbing compiles the same way it would for any other
/// component error.
impl From<ProofError> for RpcError {
    fn from(e: ProofError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}
