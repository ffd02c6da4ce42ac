// Path: crates/storage/src/token_table.rs
//! An in-memory [`TokenTable`] backed by `dashmap`, matching the ephemeral,
//! single-node-lifetime nature of shard-transfer authorization tokens.

use async_trait::async_trait;
use dashmap::DashMap;
use shardnet_api::token_table::{TokenError, TokenRecord, TokenTable};
use shardnet_types::contact::Contact;

/// An ephemeral, process-local table of outstanding transfer authorizations.
#[derive(Debug, Default)]
pub struct InMemoryTokenTable {
    tokens: DashMap<String, TokenRecord>,
}

impl InMemoryTokenTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenTable for InMemoryTokenTable {
    async fn accept(&self, token: &str, hash_hex: &str, counterparty: Contact, expires_at_ms: u64) {
        self.tokens.insert(
            token.to_string(),
            TokenRecord {
                hash_hex: hash_hex.to_string(),
                counterparty,
                expires_at_ms,
            },
        );
    }

    async fn reject(&self, token: &str) {
        self.tokens.remove(token);
    }

    async fn authorize(
        &self,
        token: &str,
        hash_hex: &str,
        now_ms: u64,
    ) -> Result<TokenRecord, TokenError> {
        let record = self
            .tokens
            .get(token)
            .map(|r| r.value().clone())
            .ok_or(TokenError::Unauthorized)?;
        if record.hash_hex != hash_hex || record.expires_at_ms < now_ms {
            return Err(TokenError::Unauthorized);
        }
        Ok(record)
    }

    async fn revoke(&self, token: &str) {
        self.tokens.remove(token);
    }

    async fn sweep(&self, now_ms: u64) -> usize {
        let expired: Vec<String> = self
            .tokens
            .iter()
            .filter(|entry| entry.value().expires_at_ms < now_ms)
            .map(|entry| entry.key().clone())
            .collect();
        for token in &expired {
            self.tokens.remove(token);
        }
        expired.len()
    }
}
