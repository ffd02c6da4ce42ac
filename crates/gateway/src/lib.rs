// Path: crates/gateway/src/lib.rs
#![forbid(unsafe_code)]

//! The HTTP shard-transfer server: an
//! unauthenticated identity handshake, the overlay RPC ingress route, and
//! the token-gated shard upload/download endpoints. Bulk shard bytes never
//! cross the overlay transport — they flow here, authorized by tokens the
//! RPC handlers mint.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    error_handling::HandleErrorLayer,
    extract::{ConnectInfo, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use futures::StreamExt;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use shardnet_api::contract_store::{contract_key, ContractStore};
use shardnet_api::rpc_ingress::RpcIngress;
use shardnet_api::shard_store::ShardStore;
use shardnet_api::token_table::TokenTable;
use shardnet_crypto::algorithms::content_hash::StreamingDataHasher;
use shardnet_types::contact::{Contact, Identity};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tower::{
    limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError,
    ServiceBuilder,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

// --- Error handling ---

/// Uniform HTTP error shape for the ingress and shard-transfer routes.
pub enum AppError {
    /// 400: malformed request, or an upload's bytes fail contract validation.
    BadRequest(String),
    /// 404: no contract or shard exists for the requested hash.
    NotFound(String),
    /// 401: token missing, expired, or naming a different hash.
    Unauthorized(String),
    /// 500: a backend (store, RPC dispatch) failure.
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::NotFound(s) => (StatusCode::NOT_FOUND, s),
            AppError::Unauthorized(s) => (StatusCode::UNAUTHORIZED, s),
            AppError::Internal(s) => {
                tracing::error!(target: "shard-gateway", error = %s, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, s)
            }
        };
        (status, msg).into_response()
    }
}

async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "overloaded")
    }
}

// --- Rate limiter: a token-bucket, keyed per source IP ---

#[derive(Clone)]
struct IpLimiter {
    buckets: Arc<DashMap<IpAddr, Bucket>>,
    rps: f64,
    burst: f64,
    trusted_proxy_cidrs: Arc<Vec<IpNetwork>>,
}

#[derive(Clone)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl IpLimiter {
    fn new(rps: u32, burst: u32, trusted_proxy_cidrs: Arc<Vec<IpNetwork>>) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            rps: rps as f64,
            burst: burst as f64,
            trusted_proxy_cidrs,
        }
    }

    fn client_ip(&self, req: &Request<Body>) -> IpAddr {
        if let Some(peer_ip) = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|c| c.0.ip())
        {
            if self
                .trusted_proxy_cidrs
                .iter()
                .any(|cidr| cidr.contains(peer_ip))
            {
                if let Some(xff) = req
                    .headers()
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                {
                    if let Some(first) = xff.split(',').next() {
                        if let Ok(ip) = first.trim().parse::<IpAddr>() {
                            return ip;
                        }
                    }
                }
            }
            return peer_ip;
        }
        IpAddr::from([127, 0, 0, 1])
    }

    fn allow(&self, req: &Request<Body>) -> bool {
        let ip = self.client_ip(req);
        let now = Instant::now();
        let mut entry = self.buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.burst,
            last: now,
        });
        let elapsed = now.duration_since(entry.last).as_secs_f64();
        entry.tokens = (entry.tokens + elapsed * self.rps).min(self.burst);
        entry.last = now;
        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn rate_limit_middleware(State(limiter): State<IpLimiter>, req: Request, next: Next) -> Response {
    if limiter.allow(&req) {
        next.run(req).await
    } else {
        (StatusCode::TOO_MANY_REQUESTS, "too many requests").into_response()
    }
}

// --- Shared server state ---

#[derive(Clone)]
struct GatewayState {
    identity: Identity,
    contact: Contact,
    shard_store: Arc<dyn ShardStore>,
    token_table: Arc<dyn TokenTable>,
    contract_store: Arc<dyn ContractStore>,
    rpc: Arc<dyn RpcIngress>,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// --- GET / : identity handshake ---

async fn identify_handler(State(state): State<Arc<GatewayState>>) -> Json<(String, Contact)> {
    Json((state.identity.to_hex(), state.contact.clone()))
}

// --- POST /rpc/ : overlay RPC ingress ---

#[derive(Deserialize)]
struct RpcRequest {
    verb: String,
    #[serde(default)]
    params: serde_json::Value,
    contact: Contact,
}

#[derive(Serialize)]
struct RpcOkResponse {
    result: serde_json::Value,
}

#[derive(Serialize)]
struct RpcErrResponse {
    error: String,
}

async fn rpc_handler(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<RpcRequest>,
) -> Response {
    match state.rpc.dispatch(&req.verb, req.params, req.contact).await {
        Ok(result) => Json(RpcOkResponse { result }).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(RpcErrResponse {
                error: e.message.clone(),
            }),
        )
            .into_response(),
    }
}

// --- /shards/{hash} upload/download ---

#[derive(Deserialize)]
struct TokenQuery {
    token: String,
}

async fn upload_handler(
    State(state): State<Arc<GatewayState>>,
    Path(hash_hex): Path<String>,
    Query(q): Query<TokenQuery>,
    request: Request,
) -> Result<StatusCode, AppError> {
    let record = state
        .token_table
        .authorize(&q.token, &hash_hex, now_ms())
        .await
        .map_err(|_| {
            shardnet_telemetry::shard_transfer_metrics().inc_token_unauthorized();
            AppError::Unauthorized("token not authorized for this hash".to_string())
        })?;

    let key = contract_key(&hash_hex, record.counterparty.xpub());
    let contract = state
        .contract_store
        .get(&key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("no contract for shard".to_string()))?;

    let mut writer = state
        .shard_store
        .create_write_stream(&hash_hex)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let mut hasher = StreamingDataHasher::new();
    let mut written: u64 = 0;
    let mut stream = request.into_body().into_data_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::Internal(e.to_string()))?;
        written += chunk.len() as u64;
        if written > contract.data_size {
            let _ = state.shard_store.unlink(&hash_hex).await;
            shardnet_telemetry::shard_transfer_metrics()
                .inc_shard_upload_rejected("size_overflow");
            return Err(AppError::BadRequest(
                "Shard exceeds contract data_size".to_string(),
            ));
        }
        hasher.update(&chunk);
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }
    writer
        .shutdown()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    drop(writer);

    let computed = hex::encode(hasher.finalize());
    if computed != hash_hex {
        let _ = state.shard_store.unlink(&hash_hex).await;
        shardnet_telemetry::shard_transfer_metrics().inc_shard_upload_rejected("hash_mismatch");
        return Err(AppError::BadRequest(
            "Hash does not match contract".to_string(),
        ));
    }

    state
        .shard_store
        .commit(&hash_hex)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    state.token_table.revoke(&q.token).await;
    shardnet_telemetry::shard_transfer_metrics().inc_shard_uploaded();
    tracing::info!(target: "shard-gateway", hash = %hash_hex, "shard uploaded");
    Ok(StatusCode::OK)
}

async fn download_handler(
    State(state): State<Arc<GatewayState>>,
    Path(hash_hex): Path<String>,
    Query(q): Query<TokenQuery>,
) -> Result<Response, AppError> {
    state
        .token_table
        .authorize(&q.token, &hash_hex, now_ms())
        .await
        .map_err(|_| {
            shardnet_telemetry::shard_transfer_metrics().inc_token_unauthorized();
            AppError::Unauthorized("token not authorized for this hash".to_string())
        })?;

    let reader = state
        .shard_store
        .create_read_stream(&hash_hex)
        .await
        .map_err(|_| AppError::NotFound("shard not found".to_string()))?;

    let token_table = state.token_table.clone();
    let token = q.token.clone();
    let hash_for_log = hash_hex.clone();
    let stream = futures::stream::unfold((reader, false), move |(mut reader, done)| {
        let token_table = token_table.clone();
        let token = token.clone();
        let hash_for_log = hash_for_log.clone();
        async move {
            if done {
                return None;
            }
            let mut buf = vec![0u8; 64 * 1024];
            match tokio::io::AsyncReadExt::read(&mut reader, &mut buf).await {
                Ok(0) => {
                    token_table.revoke(&token).await;
                    shardnet_telemetry::shard_transfer_metrics().inc_shard_downloaded();
                    tracing::info!(target: "shard-gateway", hash = %hash_for_log, "shard downloaded");
                    None
                }
                Ok(n) => {
                    buf.truncate(n);
                    Some((Ok::<Bytes, std::io::Error>(Bytes::from(buf)), (reader, false)))
                }
                Err(e) => Some((Err(e), (reader, true))),
            }
        }
    });

    let body = Body::from_stream(stream);
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response())
}

async fn shard_method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

// --- Server ---

/// Construction options for [`run_server`].
pub struct GatewayConfig {
    /// Socket address to bind the HTTP listener to.
    pub listen_addr: String,
    /// Requests/second sustained per client IP.
    pub rps: u32,
    /// Burst capacity per client IP.
    pub burst: u32,
    /// Maximum request body size, in KiB (bounds a single shard upload).
    pub body_limit_kb: usize,
    /// CIDR ranges whose `X-Forwarded-For` header is trusted for rate-limiting.
    pub trusted_proxies: Vec<String>,
}

/// Runs the shard-transfer HTTP server until `shutdown_rx` fires.
#[allow(clippy::too_many_arguments)]
pub async fn run_server(
    config: GatewayConfig,
    identity: Identity,
    contact: Contact,
    shard_store: Arc<dyn ShardStore>,
    token_table: Arc<dyn TokenTable>,
    contract_store: Arc<dyn ContractStore>,
    rpc: Arc<dyn RpcIngress>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let cidrs = Arc::new(
        config
            .trusted_proxies
            .iter()
            .filter_map(|s| IpNetwork::from_str(s).ok())
            .collect(),
    );
    let limiter = IpLimiter::new(config.rps, config.burst, cidrs);

    let state = Arc::new(GatewayState {
        identity,
        contact,
        shard_store,
        token_table,
        contract_store,
        rpc,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let shards_router = Router::new().route(
        "/shards/:hash",
        post(upload_handler)
            .get(download_handler)
            .fallback(shard_method_not_allowed),
    );

    let app = Router::new()
        .route("/", get(identify_handler))
        .route("/rpc/", post(rpc_handler))
        .merge(shards_router)
        .route_layer(middleware::from_fn_with_state(
            limiter.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(map_middleware_error))
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(256))
                .layer(TimeoutLayer::new(Duration::from_secs(60))),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024));

    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!(target: "shard-gateway", %addr, "shard transfer gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_rx.changed().await.ok();
        tracing::info!(target: "shard-gateway", "shutting down gracefully");
    });

    if let Err(e) = server.await {
        tracing::error!(target: "shard-gateway", error = %e, "server error");
    }

    Ok(())
}
