// Path: crates/node/src/bin/shardnet-node.rs
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

use anyhow::{Context, Result};
use clap::Parser;
use shardnet_node::config::NodeConfig;
use shardnet_node::Node;

/// Loads this node's BIP32 signing seed from `<data_dir>/identity.seed`,
/// generating and persisting a fresh 32-byte seed on first run. A node's
/// identity (and therefore every `Identity`/HD key a counterparty has
/// ever seen for it) is derived from this seed, so it must survive restarts.
fn load_or_create_signing_seed(data_dir: &std::path::Path) -> Result<Vec<u8>> {
    let path = data_dir.join("identity.seed");
    if path.exists() {
        std::fs::read(&path).with_context(|| format!("reading signing seed {}", path.display()))
    } else {
        use rand::RngCore;
        let mut seed = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        std::fs::write(&path, &seed)
            .with_context(|| format!("writing signing seed {}", path.display()))?;
        Ok(seed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // reqwest's rustls-tls backend needs a process-wide default crypto
    // provider installed before the first HTTPS connection (mirror.rs,
    // identify_service).
    let _ = rustls::crypto::ring::default_provider().install_default();

    shardnet_telemetry::init::init_tracing()?;

    let telemetry_addr_str =
        std::env::var("SHARDNODE_TELEMETRY_ADDR").unwrap_or_else(|_| "127.0.0.1:9617".to_string());
    let telemetry_addr = telemetry_addr_str
        .parse()
        .with_context(|| format!("parsing telemetry addr {telemetry_addr_str}"))?;
    tokio::spawn(shardnet_telemetry::http::run_server(telemetry_addr));

    let opts = NodeConfig::parse();
    let config = opts.resolve().context("resolving node configuration")?;

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    let signing_seed = load_or_create_signing_seed(&config.data_dir)?;

    tracing::info!(
        target: "node",
        event = "startup",
        listen_addr = %config.listen_addr,
        http_addr = %config.http_addr,
        data_dir = %config.data_dir.display(),
    );

    let node = Node::build(&config, &signing_seed)
        .await
        .context("building node")?;
    node.start(&config.listen_addr, &config)
        .await
        .context("starting node")?;

    tracing::info!(target: "node", event = "ready", identity = %hex::encode(node.identity().0));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "node", event = "shutdown", reason = "ctrl-c");
        }
    }

    node.stop().await.context("stopping node")?;
    tracing::info!(target: "node", event = "shutdown", reason = "complete");

    Ok(())
}
