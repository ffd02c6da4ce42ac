// Path: crates/api/src/shard_store.rs
//! The `ShardStore` trait: a content-addressed blob store for shard bytes,
//! keyed by the `data_hash` of the contract that authorized them.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::ErrorKind;

/// Errors raised by a `ShardStore` implementation.
#[derive(Debug, Error)]
pub enum ShardStoreError {
    /// No shard exists under the requested hash.
    #[error("no shard for hash {0}")]
    NotFound(String),
    /// The backing filesystem rejected the read, write, or unlink.
    #[error("shard store I/O error: {0}")]
    Io(String),
}

impl crate::HasErrorKind for ShardStoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            ShardStoreError::NotFound(_) => ErrorKind::NotFound,
            ShardStoreError::Io(_) => ErrorKind::Upstream,
        }
    }
}

/// Free/allocated byte counts for a shard store's backing volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardStoreSize {
    /// Bytes still free on the backing volume.
    pub available: u64,
    /// Bytes currently occupied by committed shards.
    pub allocated: u64,
}

/// A content-addressed store of shard bytes.
///
/// Write streams MUST be crash-safe: a reader never observes a half-written
/// shard. Implementations satisfy this with a `.partial` sibling file renamed
/// into place only after the write stream closes successfully.
#[async_trait]
pub trait ShardStore: Send + Sync {
    /// `true` iff a committed (non-partial) shard exists under `hash_hex`.
    async fn exists(&self, hash_hex: &str) -> Result<bool, ShardStoreError>;

    /// Opens a read stream over the committed shard bytes.
    async fn create_read_stream(
        &self,
        hash_hex: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ShardStoreError>;

    /// Opens a write stream that lands bytes in a `.partial` sibling; the
    /// caller MUST call [`ShardStore::commit`] on success or
    /// [`ShardStore::unlink`] on failure to avoid leaking the partial file.
    async fn create_write_stream(
        &self,
        hash_hex: &str,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>, ShardStoreError>;

    /// Renames the `.partial` file into its final committed location.
    async fn commit(&self, hash_hex: &str) -> Result<(), ShardStoreError>;

    /// Removes both the committed shard and any partial sibling. MUST be
    /// safe to call while a concurrent reader holds an open read stream.
    async fn unlink(&self, hash_hex: &str) -> Result<(), ShardStoreError>;

    /// Current free/allocated byte counts.
    async fn size(&self) -> Result<ShardStoreSize, ShardStoreError>;
}
