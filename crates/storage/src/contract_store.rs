// Path: crates/storage/src/contract_store.rs
//! A [`ContractStore`] backed by a single-table `redb` database, SCALE-encoding
//! each [`Contract`] the way the canonical codec in `shardnet-types` does for
//! signing preimages.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use shardnet_api::contract_store::{ContractError, ContractStore};
use shardnet_types::codec::{from_bytes_canonical, to_bytes_canonical};
use shardnet_types::contract::Contract;

const CONTRACTS: TableDefinition<&str, &[u8]> = TableDefinition::new("CONTRACTS");

fn backend<E: std::fmt::Display>(e: E) -> ContractError {
    ContractError::Backend(e.to_string())
}

/// A durable, content-addressed contract store backed by `redb`.
#[derive(Clone)]
pub struct RedbContractStore {
    db: Arc<Database>,
}

impl RedbContractStore {
    /// Opens (creating if absent) the redb database at `path` and ensures the
    /// `CONTRACTS` table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContractError> {
        let db = Database::create(path).map_err(backend)?;
        {
            let w = db.begin_write().map_err(backend)?;
            w.open_table(CONTRACTS).map_err(backend)?;
            w.commit().map_err(backend)?;
        }
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl ContractStore for RedbContractStore {
    async fn get(&self, key: &str) -> Result<Option<Contract>, ContractError> {
        let db = self.db.clone();
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || {
            let r = db.begin_read().map_err(backend)?;
            let t = r.open_table(CONTRACTS).map_err(backend)?;
            match t.get(key.as_str()).map_err(backend)? {
                Some(v) => {
                    let contract: Contract = from_bytes_canonical(v.value())
                        .map_err(ContractError::Codec)?;
                    Ok(Some(contract))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| ContractError::Backend(e.to_string()))?
    }

    async fn put(&self, key: &str, contract: &Contract) -> Result<(), ContractError> {
        let db = self.db.clone();
        let key = key.to_owned();
        let bytes = to_bytes_canonical(contract).map_err(ContractError::Codec)?;
        tokio::task::spawn_blocking(move || {
            let w = db.begin_write().map_err(backend)?;
            {
                let mut t = w.open_table(CONTRACTS).map_err(backend)?;
                t.insert(key.as_str(), bytes.as_slice()).map_err(backend)?;
            }
            w.commit().map_err(backend)
        })
        .await
        .map_err(|e| ContractError::Backend(e.to_string()))?
    }

    async fn delete(&self, key: &str) -> Result<(), ContractError> {
        let db = self.db.clone();
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || {
            let w = db.begin_write().map_err(backend)?;
            {
                let mut t = w.open_table(CONTRACTS).map_err(backend)?;
                t.remove(key.as_str()).map_err(backend)?;
            }
            w.commit().map_err(backend)
        })
        .await
        .map_err(|e| ContractError::Backend(e.to_string()))?
    }

    async fn reapable(&self, now_ms: u64, grace_ms: u64) -> Result<Vec<String>, ContractError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let r = db.begin_read().map_err(backend)?;
            let t = r.open_table(CONTRACTS).map_err(backend)?;
            let cutoff = now_ms.saturating_sub(grace_ms);
            let mut out = Vec::new();
            for entry in t.iter().map_err(backend)? {
                let (k, v) = entry.map_err(backend)?;
                let contract: Contract =
                    from_bytes_canonical(v.value()).map_err(ContractError::Codec)?;
                if contract.store_end < cutoff {
                    out.push(k.value().to_string());
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| ContractError::Backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardnet_types::contract::Contract;

    fn sample(data_hash: [u8; 20], store_end: u64) -> Contract {
        Contract {
            data_hash,
            data_size: 1024,
            renter_id: [1u8; 20],
            farmer_id: [2u8; 20],
            renter_hd_key: vec![3u8; 33],
            farmer_hd_key: vec![4u8; 33],
            renter_hd_index: 0,
            farmer_hd_index: 0,
            renter_signature: None,
            farmer_signature: None,
            store_begin: 0,
            store_end,
            audit_leaves: vec![],
            payment_destination: String::new(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RedbContractStore::open(dir.path().join("contracts.redb")).expect("open");
        let c = sample([1u8; 20], 1_000);
        store.put("k1", &c).await.expect("put");
        let got = store.get("k1").await.expect("get").expect("present");
        assert_eq!(got.data_hash, c.data_hash);
        assert_eq!(got.store_end, 1_000);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RedbContractStore::open(dir.path().join("contracts.redb")).expect("open");
        assert!(store.get("absent").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RedbContractStore::open(dir.path().join("contracts.redb")).expect("open");
        let c = sample([1u8; 20], 1_000);
        store.put("k1", &c).await.expect("put");
        store.delete("k1").await.expect("delete");
        store.delete("k1").await.expect("delete again");
        assert!(store.get("k1").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn reapable_respects_grace_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RedbContractStore::open(dir.path().join("contracts.redb")).expect("open");
        store.put("expired", &sample([1u8; 20], 100)).await.expect("put");
        store.put("fresh", &sample([2u8; 20], 10_000)).await.expect("put");

        let reapable = store.reapable(1_000, 50).await.expect("reapable");
        assert_eq!(reapable, vec!["expired".to_string()]);
    }
}
