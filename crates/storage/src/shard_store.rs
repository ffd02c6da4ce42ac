// Path: crates/storage/src/shard_store.rs
//! A [`ShardStore`] backed by a flat directory of content-addressed files.
//! Writers land bytes in a `{hash}.partial` sibling, renamed into place only
//! once the stream closes successfully, so a reader never observes a
//! half-written shard.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use shardnet_api::shard_store::{ShardStore, ShardStoreError, ShardStoreSize};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite};

fn io_err<E: std::fmt::Display>(e: E) -> ShardStoreError {
    ShardStoreError::Io(e.to_string())
}

/// A content-addressed shard store rooted at a single directory.
///
/// `capacity_bytes` bounds the volume this store is permitted to occupy;
/// [`ShardStore::size`] reports `available` as the remainder against bytes
/// currently committed, the figure farmers announce over the capacity topic.
#[derive(Clone)]
pub struct FsShardStore {
    root: Arc<PathBuf>,
    capacity_bytes: u64,
}

impl FsShardStore {
    /// Creates the store, creating `root` if it does not already exist.
    pub async fn open(root: impl Into<PathBuf>, capacity_bytes: u64) -> Result<Self, ShardStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(io_err)?;
        Ok(Self {
            root: Arc::new(root),
            capacity_bytes,
        })
    }

    fn committed_path(&self, hash_hex: &str) -> PathBuf {
        self.root.join(hash_hex)
    }

    fn partial_path(&self, hash_hex: &str) -> PathBuf {
        self.root.join(format!("{hash_hex}.partial"))
    }

    async fn allocated_bytes(&self) -> Result<u64, ShardStoreError> {
        let mut total = 0u64;
        let mut entries = fs::read_dir(self.root.as_path()).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(".partial") {
                continue;
            }
            let meta = entry.metadata().await.map_err(io_err)?;
            if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl ShardStore for FsShardStore {
    async fn exists(&self, hash_hex: &str) -> Result<bool, ShardStoreError> {
        Ok(fs::try_exists(self.committed_path(hash_hex))
            .await
            .map_err(io_err)?)
    }

    async fn create_read_stream(
        &self,
        hash_hex: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ShardStoreError> {
        let path = self.committed_path(hash_hex);
        match fs::File::open(&path).await {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ShardStoreError::NotFound(hash_hex.to_string()))
            }
            Err(e) => Err(io_err(e)),
        }
    }

    async fn create_write_stream(
        &self,
        hash_hex: &str,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>, ShardStoreError> {
        let path = self.partial_path(hash_hex);
        let f = fs::File::create(&path).await.map_err(io_err)?;
        Ok(Box::new(f))
    }

    async fn commit(&self, hash_hex: &str) -> Result<(), ShardStoreError> {
        let partial = self.partial_path(hash_hex);
        let committed = self.committed_path(hash_hex);
        fs::rename(&partial, &committed).await.map_err(io_err)
    }

    async fn unlink(&self, hash_hex: &str) -> Result<(), ShardStoreError> {
        for path in [self.committed_path(hash_hex), self.partial_path(hash_hex)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(e)),
            }
        }
        Ok(())
    }

    async fn size(&self) -> Result<ShardStoreSize, ShardStoreError> {
        let allocated = self.allocated_bytes().await?;
        let available = self.capacity_bytes.saturating_sub(allocated);
        Ok(ShardStoreSize {
            available,
            allocated,
        })
    }
}

/// Shared monotonic counter used by tests needing distinct temp directories.
#[cfg(test)]
static TEST_DIR_SEQ: AtomicU64 = AtomicU64::new(0);

#[cfg(test)]
fn test_root() -> PathBuf {
    let n = TEST_DIR_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("shardnet-shard-store-test-{n}"))
}
