// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured RPC verb-dispatch metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn rpc_metrics() -> &'static dyn RpcMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured shard-transfer metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn shard_transfer_metrics() -> &'static dyn ShardTransferMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured offer-auction metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn offer_metrics() -> &'static dyn OfferMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to the networking layer (libp2p).
pub trait NetworkMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for gossip messages received, labeled by topic.
    fn inc_gossip_messages_received(&self, topic: &str);
    /// Increments the gauge for the current number of connected peers.
    fn inc_connected_peers(&self);
    /// Decrements the gauge for the current number of connected peers.
    fn dec_connected_peers(&self);
}
impl NetworkMetricsSink for NopSink {
    fn inc_gossip_messages_received(&self, _topic: &str) {}
    fn inc_connected_peers(&self) {}
    fn dec_connected_peers(&self) {}
}

/// A sink for metrics related to the overlay RPC verb dispatcher
/// (`RpcHandlers::dispatch`).
pub trait RpcMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of one verb dispatch, labeled by verb.
    fn observe_request_duration(&self, verb: &str, duration_secs: f64);
    /// Increments a counter for total verb dispatches, labeled by verb and outcome
    /// (`"ok"` or an [`crate::sinks::ErrorMetricsSink`] kind label).
    fn inc_requests_total(&self, verb: &str, outcome: &str);
}
impl RpcMetricsSink for NopSink {
    fn observe_request_duration(&self, _verb: &str, _duration_secs: f64) {}
    fn inc_requests_total(&self, _verb: &str, _outcome: &str) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A sink for metrics related to the HTTP shard-transfer gateway's
/// upload/download endpoints and the token table that gates them.
pub trait ShardTransferMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for completed shard uploads.
    fn inc_shard_uploaded(&self);
    /// Increments a counter for completed shard downloads.
    fn inc_shard_downloaded(&self);
    /// Increments a counter for uploads rejected for hash mismatch or size overflow.
    fn inc_shard_upload_rejected(&self, reason: &'static str);
    /// Increments a counter for token authorization failures (expired, unknown, wrong hash).
    fn inc_token_unauthorized(&self);
    /// Observes how many expired token records a periodic sweep dropped.
    fn observe_token_sweep(&self, reaped: u64);
}
impl ShardTransferMetricsSink for NopSink {
    fn inc_shard_uploaded(&self) {}
    fn inc_shard_downloaded(&self) {}
    fn inc_shard_upload_rejected(&self, _reason: &'static str) {}
    fn inc_token_unauthorized(&self) {}
    fn observe_token_sweep(&self, _reaped: u64) {}
}

/// A sink for metrics related to the renter-side offer-auction subsystem
/// (`OfferStream`).
pub trait OfferMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the gauge for the number of currently registered OfferStreams.
    fn inc_open_offer_streams(&self);
    /// Decrements the gauge for the number of currently registered OfferStreams.
    fn dec_open_offer_streams(&self);
    /// Increments a counter for an offer admitted onto a stream's queue.
    fn inc_offer_admitted(&self);
    /// Increments a counter for an offer rejected by the admission policy, labeled by reason.
    fn inc_offer_rejected(&self, reason: &'static str);
}
impl OfferMetricsSink for NopSink {
    fn inc_open_offer_streams(&self) {}
    fn dec_open_offer_streams(&self) {}
    fn inc_offer_admitted(&self) {}
    fn inc_offer_rejected(&self, _reason: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    NetworkMetricsSink
    + RpcMetricsSink
    + ErrorMetricsSink
    + ShardTransferMetricsSink
    + OfferMetricsSink
{
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where
    T: NetworkMetricsSink
        + RpcMetricsSink
        + ErrorMetricsSink
        + ShardTransferMetricsSink
        + OfferMetricsSink
{
}
