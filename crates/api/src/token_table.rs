// Path: crates/api/src/token_table.rs
//! The `TokenTable` trait: single-use, time-limited authorization tokens
//! gating one HTTP shard transfer for a `(hash, counterparty)` pair.

use async_trait::async_trait;
use shardnet_types::contact::Contact;
use thiserror::Error;

use crate::ErrorKind;

/// Errors raised by a `TokenTable` implementation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The token does not exist, has expired, or names a different hash.
    #[error("token not authorized for this hash")]
    Unauthorized,
}

impl crate::HasErrorKind for TokenError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Unauthorized
    }
}

/// A single outstanding authorization.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    /// The shard hash (lowercase hex) this token authorizes transfer of.
    pub hash_hex: String,
    /// Who the token was issued to.
    pub counterparty: Contact,
    /// Unix-millisecond expiry; authorization fails once `now_ms` passes this.
    pub expires_at_ms: u64,
}

/// An ephemeral table of shard-transfer authorization tokens.
#[async_trait]
pub trait TokenTable: Send + Sync {
    /// Records a new token, valid until `now_ms + ttl_ms`.
    async fn accept(&self, token: &str, hash_hex: &str, counterparty: Contact, expires_at_ms: u64);

    /// Removes a token unconditionally (used to reject an offer before it was accepted).
    async fn reject(&self, token: &str);

    /// Returns the record for `token` iff present, unexpired as of `now_ms`,
    /// and naming `hash_hex`. Does not consume the token — callers revoke
    /// explicitly via [`TokenTable::revoke`] once the transfer it authorizes
    /// actually completes, so a failed-then-retried transfer attempt within
    /// the same authorization doesn't need a fresh token.
    async fn authorize(
        &self,
        token: &str,
        hash_hex: &str,
        now_ms: u64,
    ) -> Result<TokenRecord, TokenError>;

    /// Removes a token, making it single-use once the transfer it authorized
    /// has completed (a second transfer attempt then fails `authorize`).
    async fn revoke(&self, token: &str);

    /// Drops every record whose `expires_at_ms < now_ms`. Run periodically.
    async fn sweep(&self, now_ms: u64) -> usize;
}
