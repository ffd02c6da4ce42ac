// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_histogram, register_histogram_vec,
    register_int_counter, register_int_counter_vec, Gauge, Histogram, HistogramVec, IntCounter,
    IntCounterVec,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static NETWORK_CONNECTED_PEERS: OnceCell<Gauge> = OnceCell::new();
static GOSSIP_MESSAGES_RECEIVED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RPC_REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RPC_REQUEST_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static SHARD_UPLOADS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static SHARD_DOWNLOADS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static SHARD_UPLOAD_REJECTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static TOKEN_UNAUTHORIZED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static TOKEN_SWEEP_REAPED: OnceCell<Histogram> = OnceCell::new();
static OFFER_STREAMS_OPEN: OnceCell<Gauge> = OnceCell::new();
static OFFER_ADMITTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static OFFER_REJECTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// This will panic if `install()` has not been called, which is intentional
/// as it indicates a critical application setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl NetworkMetricsSink for PrometheusSink {
    fn inc_connected_peers(&self) {
        get_metric!(NETWORK_CONNECTED_PEERS).inc();
    }
    fn dec_connected_peers(&self) {
        get_metric!(NETWORK_CONNECTED_PEERS).dec();
    }
    fn inc_gossip_messages_received(&self, topic: &str) {
        get_metric!(GOSSIP_MESSAGES_RECEIVED_TOTAL)
            .with_label_values(&[topic])
            .inc();
    }
}
impl RpcMetricsSink for PrometheusSink {
    fn observe_request_duration(&self, verb: &str, duration_secs: f64) {
        get_metric!(RPC_REQUEST_DURATION_SECONDS)
            .with_label_values(&[verb])
            .observe(duration_secs);
    }
    fn inc_requests_total(&self, verb: &str, outcome: &str) {
        get_metric!(RPC_REQUESTS_TOTAL)
            .with_label_values(&[verb, outcome])
            .inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

impl ShardTransferMetricsSink for PrometheusSink {
    fn inc_shard_uploaded(&self) {
        get_metric!(SHARD_UPLOADS_TOTAL).inc();
    }
    fn inc_shard_downloaded(&self) {
        get_metric!(SHARD_DOWNLOADS_TOTAL).inc();
    }
    fn inc_shard_upload_rejected(&self, reason: &'static str) {
        get_metric!(SHARD_UPLOAD_REJECTED_TOTAL)
            .with_label_values(&[reason])
            .inc();
    }
    fn inc_token_unauthorized(&self) {
        get_metric!(TOKEN_UNAUTHORIZED_TOTAL).inc();
    }
    fn observe_token_sweep(&self, reaped: u64) {
        get_metric!(TOKEN_SWEEP_REAPED).observe(reaped as f64);
    }
}

impl OfferMetricsSink for PrometheusSink {
    fn inc_open_offer_streams(&self) {
        get_metric!(OFFER_STREAMS_OPEN).inc();
    }
    fn dec_open_offer_streams(&self) {
        get_metric!(OFFER_STREAMS_OPEN).dec();
    }
    fn inc_offer_admitted(&self) {
        get_metric!(OFFER_ADMITTED_TOTAL).inc();
    }
    fn inc_offer_rejected(&self, reason: &'static str) {
        get_metric!(OFFER_REJECTED_TOTAL)
            .with_label_values(&[reason])
            .inc();
    }
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    NETWORK_CONNECTED_PEERS
        .set(register_gauge!(
            "shardnet_networking_connected_peers",
            "Current number of connected libp2p peers."
        )?)
        .expect("static already initialized");
    GOSSIP_MESSAGES_RECEIVED_TOTAL
        .set(register_int_counter_vec!(
            "shardnet_networking_gossip_messages_received_total",
            "Total gossip messages received.",
            &["topic"]
        )?)
        .expect("static already initialized");
    RPC_REQUESTS_TOTAL
        .set(register_int_counter_vec!(
            "shardnet_rpc_requests_total",
            "Total overlay RPC verb dispatches, labeled by verb and outcome.",
            &["verb", "outcome"]
        )?)
        .expect("static already initialized");
    RPC_REQUEST_DURATION_SECONDS
        .set(register_histogram_vec!(
            "shardnet_rpc_request_duration_seconds",
            "Latency of overlay RPC verb dispatches, labeled by verb.",
            &["verb"],
            exponential_buckets(0.001, 2.0, 15)?
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "shardnet_errors_total",
            "Total number of errors, categorized by type and variant.",
            &["kind", "variant"]
        )?)
        .expect("static already initialized");

    SHARD_UPLOADS_TOTAL
        .set(register_int_counter!(
            "shardnet_shard_uploads_total",
            "Total shard uploads accepted by the shard-transfer gateway."
        )?)
        .expect("static already initialized");
    SHARD_DOWNLOADS_TOTAL
        .set(register_int_counter!(
            "shardnet_shard_downloads_total",
            "Total shard downloads served by the shard-transfer gateway."
        )?)
        .expect("static already initialized");
    SHARD_UPLOAD_REJECTED_TOTAL
        .set(register_int_counter_vec!(
            "shardnet_shard_upload_rejected_total",
            "Total shard uploads rejected, labeled by reason.",
            &["reason"]
        )?)
        .expect("static already initialized");
    TOKEN_UNAUTHORIZED_TOTAL
        .set(register_int_counter!(
            "shardnet_token_unauthorized_total",
            "Total shard-transfer requests rejected for a missing/expired/mismatched token."
        )?)
        .expect("static already initialized");
    TOKEN_SWEEP_REAPED
        .set(register_histogram!(
            "shardnet_token_sweep_reaped",
            "Number of expired token records dropped per periodic sweep.",
            vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 500.0]
        )?)
        .expect("static already initialized");
    OFFER_STREAMS_OPEN
        .set(register_gauge!(
            "shardnet_offer_streams_open",
            "Current number of registered OfferStream auctions."
        )?)
        .expect("static already initialized");
    OFFER_ADMITTED_TOTAL
        .set(register_int_counter!(
            "shardnet_offer_admitted_total",
            "Total offers admitted onto an OfferStream's queue."
        )?)
        .expect("static already initialized");
    OFFER_REJECTED_TOTAL
        .set(register_int_counter_vec!(
            "shardnet_offer_rejected_total",
            "Total offers rejected by the admission policy, labeled by reason.",
            &["reason"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
