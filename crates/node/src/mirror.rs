// Path: crates/node/src/mirror.rs
//! The concrete [`MirrorTransport`]: streams a locally held shard to another
//! node's `POST /shards/{hash}?token=...` upload route with `reqwest`,
//! matching the HTTP gateway's own upload contract so a mirror push and a
//! renter's direct upload are indistinguishable to the receiving node.

use std::time::Duration;

use async_trait::async_trait;
use shardnet_rpc::context::MirrorTransport;
use shardnet_rpc::error::RpcError;
use shardnet_types::contact::Contact;
use shardnet_types::error::ErrorKind;
use tokio_util::io::ReaderStream;

/// A thin `reqwest` wrapper, one client shared across every MIRROR the node
/// serves.
pub struct HttpMirrorTransport {
    client: reqwest::Client,
}

impl HttpMirrorTransport {
    /// Builds a client with a short connect timeout and a generous overall
    /// timeout, matching the HTTP gateway's own `TimeoutLayer` convention of
    /// bounding requests without starving a large shard transfer.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpMirrorTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MirrorTransport for HttpMirrorTransport {
    async fn push(
        &self,
        hash_hex: &str,
        token: &str,
        destination: &Contact,
        shard: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
    ) -> Result<serde_json::Value, RpcError> {
        let url = format!(
            "{}/shards/{}?token={}",
            destination.info.http_base_url.trim_end_matches('/'),
            hash_hex,
            token
        );
        let body = reqwest::Body::wrap_stream(ReaderStream::new(shard));
        let response = self
            .client
            .post(&url)
            .body(body)
            .send()
            .await
            .map_err(|e| RpcError::new(ErrorKind::Upstream, format!("mirror push failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RpcError::new(
                ErrorKind::Upstream,
                format!("mirror destination rejected upload: {}", response.status()),
            ));
        }
        Ok(serde_json::json!({ "status": "ok" }))
    }
}
