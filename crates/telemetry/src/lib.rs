// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Shardnet Node Telemetry
//!
//! This crate provides the observability infrastructure for the shardnet
//! storage node, including structured logging initialization, a Prometheus
//! metrics endpoint, and abstract sinks for decoupling metric instrumentation
//! from the backend.

/// A lightweight HTTP server for exposing `/metrics`, `/healthz`, and `/readyz` endpoints.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;

// Re-export the public helper functions for easy access to the global sinks.
pub use sinks::{error_metrics, offer_metrics, rpc_metrics, shard_transfer_metrics};
