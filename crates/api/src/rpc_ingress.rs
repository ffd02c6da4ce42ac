// Path: crates/api/src/rpc_ingress.rs
//! The seam between the HTTP shard-transfer gateway's `POST /rpc/` route and
//! the node's overlay RPC verb handlers. The gateway depends only on this
//! trait rather than a concrete handler type — `rpc`'s handlers are the
//! sole implementor, wired in by `node`.

use async_trait::async_trait;
use serde_json::Value;
use shardnet_types::contact::Contact;
use thiserror::Error;

use crate::ErrorKind;

/// A dispatch failure surfaced back to the overlay caller as an RPC error.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct RpcIngressError {
    /// Human-readable message, echoed verbatim to the caller for
    /// Validation-kind errors.
    pub message: String,
    /// Classification used to pick an HTTP status when the RPC ingress route
    /// itself cannot dispatch (unknown verb, malformed envelope).
    pub kind: ErrorKind,
}

impl RpcIngressError {
    /// Builds an error from any message with an explicit kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl crate::HasErrorKind for RpcIngressError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// One overlay RPC verb call, dispatched from the HTTP ingress route (or, in
/// a full overlay transport binding, from `networking`'s request-response
/// behaviour) to the node's verb handlers.
#[async_trait]
pub trait RpcIngress: Send + Sync {
    /// Dispatches `verb` with JSON-encoded `params` on behalf of `caller`,
    /// returning the JSON-encoded reply. AUDIT never returns `Err` —
    /// per-item failures are encoded in the reply value itself.
    async fn dispatch(
        &self,
        verb: &str,
        params: Value,
        caller: Contact,
    ) -> Result<Value, RpcIngressError>;
}
