// Path: crates/node/src/config.rs
//! Configuration surface: a `clap::Parser` struct with an optional
//! `--config` TOML file underneath it. Every field can also be set by
//! environment variable, layering CLI flags, environment variables, and a
//! TOML file, except the TOML file here provides the defaults CLI/env are
//! allowed to override rather than carrying mandatory operator input.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

/// The storage node's full configuration: overlay and gateway listen
/// addresses, durable-state paths, and policy knobs governing token TTL,
/// audit concurrency, offer admission, and the claims allow-list.
#[derive(Parser, Debug, Clone)]
#[command(name = "shardnet-node", about = "A shardnet storage node peer")]
pub struct NodeConfig {
    /// Path to an optional TOML file providing defaults for any field below
    /// not otherwise given on the command line or via environment variable.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Multiaddr this node's overlay transport listens on, e.g.
    /// `/ip4/0.0.0.0/tcp/4001`.
    #[clap(long, env = "SHARDNODE_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Socket address the HTTP shard-transfer gateway binds to.
    #[clap(long, env = "SHARDNODE_HTTP_ADDR")]
    pub http_addr: Option<String>,

    /// Directory holding the contract store database and the shard blob
    /// tree.
    #[clap(long, env = "SHARDNODE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Lifetime, in seconds, of a freshly minted shard-transfer token.
    #[clap(long, env = "SHARDNODE_TOKEN_TTL_SECS")]
    pub token_ttl_secs: Option<u64>,

    /// Documentation-only knob: the number of audit challenges this node
    /// processes concurrently per AUDIT batch. Handlers process a batch
    /// sequentially regardless, so this is fixed at 1 and
    /// exists only so operators see the concurrency model's bound spelled
    /// out in configuration rather than having to read the code for it.
    #[clap(long, env = "SHARDNODE_AUDIT_CONCURRENCY", default_value_t = 1)]
    pub audit_concurrency: usize,

    /// Default `maxOffers` for a freshly published OfferStream when the
    /// caller of `publishShardDescriptor` doesn't specify one.
    #[clap(long, env = "SHARDNODE_MAX_OFFERS_DEFAULT")]
    pub max_offers_default: Option<usize>,

    /// Renter extended public keys (hex) this farmer accepts CLAIMs from.
    /// A single entry of `*` accepts every renter.
    #[clap(long, env = "SHARDNODE_CLAIMS_ALLOW_LIST", value_delimiter = ',')]
    pub claims_allow_list: Vec<String>,

    /// CIDR ranges of reverse proxies the gateway's rate limiter should
    /// trust an `X-Forwarded-For` header from.
    #[clap(long, env = "SHARDNODE_TRUSTED_PROXY_CIDRS", value_delimiter = ',')]
    pub trusted_proxy_cidrs: Vec<String>,

    /// `tracing`/`EnvFilter` directive string, e.g. `info` or
    /// `shardnet_node=debug,info`.
    #[clap(long, env = "SHARDNODE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// The file-level defaults `--config` loads, every field optional so a
/// partial file only fills in what it names.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    listen_addr: Option<String>,
    http_addr: Option<String>,
    data_dir: Option<PathBuf>,
    token_ttl_secs: Option<u64>,
    audit_concurrency: Option<usize>,
    max_offers_default: Option<usize>,
    claims_allow_list: Option<Vec<String>>,
    trusted_proxy_cidrs: Option<Vec<String>>,
    log_level: Option<String>,
}

/// The fully resolved configuration every other module in this crate reads
/// from, after CLI flags, environment variables, and an optional TOML file
/// have been layered together.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub listen_addr: String,
    pub http_addr: String,
    pub data_dir: PathBuf,
    pub token_ttl_secs: u64,
    pub audit_concurrency: usize,
    pub max_offers_default: usize,
    pub claims_allow_list: Vec<String>,
    pub trusted_proxy_cidrs: Vec<String>,
    pub log_level: String,
}

impl NodeConfig {
    /// Resolves this config against its optional TOML file. CLI flags and
    /// environment variables (both already folded into `self` by the time
    /// `clap` hands it back) always win over a value the file provides;
    /// the file only fills in fields `self` left `None`/empty.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let file = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str::<FileConfig>(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        Ok(ResolvedConfig {
            listen_addr: self
                .listen_addr
                .clone()
                .or(file.listen_addr)
                .unwrap_or_else(|| "/ip4/0.0.0.0/tcp/4001".to_string()),
            http_addr: self
                .http_addr
                .clone()
                .or(file.http_addr)
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            data_dir: self
                .data_dir
                .clone()
                .or(file.data_dir)
                .unwrap_or_else(|| PathBuf::from("./shardnet-data")),
            token_ttl_secs: self.token_ttl_secs.or(file.token_ttl_secs).unwrap_or(1800),
            audit_concurrency: if self.audit_concurrency != 0 {
                self.audit_concurrency
            } else {
                file.audit_concurrency.unwrap_or(1)
            },
            max_offers_default: self
                .max_offers_default
                .or(file.max_offers_default)
                .unwrap_or(1),
            claims_allow_list: if self.claims_allow_list.is_empty() {
                file.claims_allow_list.unwrap_or_default()
            } else {
                self.claims_allow_list.clone()
            },
            trusted_proxy_cidrs: if self.trusted_proxy_cidrs.is_empty() {
                file.trusted_proxy_cidrs.unwrap_or_default()
            } else {
                self.trusted_proxy_cidrs.clone()
            },
            log_level: self
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_file_and_no_flags() {
        let cfg = NodeConfig {
            config: None,
            listen_addr: None,
            http_addr: None,
            data_dir: None,
            token_ttl_secs: None,
            audit_concurrency: 1,
            max_offers_default: None,
            claims_allow_list: vec![],
            trusted_proxy_cidrs: vec![],
            log_level: None,
        };
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.token_ttl_secs, 1800);
        assert_eq!(resolved.max_offers_default, 1);
        assert_eq!(resolved.audit_concurrency, 1);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "listen_addr = \"/ip4/127.0.0.1/tcp/9000\"\n").unwrap();

        let cfg = NodeConfig {
            config: Some(path),
            listen_addr: Some("/ip4/127.0.0.1/tcp/1111".to_string()),
            http_addr: None,
            data_dir: None,
            token_ttl_secs: None,
            audit_concurrency: 1,
            max_offers_default: None,
            claims_allow_list: vec![],
            trusted_proxy_cidrs: vec![],
            log_level: None,
        };
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.listen_addr, "/ip4/127.0.0.1/tcp/1111");
    }

    #[test]
    fn file_fills_in_unset_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "http_addr = \"127.0.0.1:9090\"\n").unwrap();

        let cfg = NodeConfig {
            config: Some(path),
            listen_addr: None,
            http_addr: None,
            data_dir: None,
            token_ttl_secs: None,
            audit_concurrency: 1,
            max_offers_default: None,
            claims_allow_list: vec![],
            trusted_proxy_cidrs: vec![],
            log_level: None,
        };
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.http_addr, "127.0.0.1:9090");
    }
}
