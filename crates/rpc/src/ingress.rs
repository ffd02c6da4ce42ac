// Path: crates/rpc/src/ingress.rs
//! `RpcHandlers`: the sole implementor of [`shardnet_api::rpc_ingress::RpcIngress`],
//! dispatching a verb name and JSON params to one of the eight handler
//! functions in [`crate::handlers`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use shardnet_api::rpc_ingress::{RpcIngress, RpcIngressError};
use shardnet_types::contact::Contact;
use shardnet_types::error::{ErrorKind, HasErrorKind};

use crate::context::HandlerContext;
use crate::handlers;

/// The eight-verb overlay RPC dispatcher, wired into the HTTP gateway's
/// ingress route (and, on a full overlay transport binding, into
/// `networking`'s request-response behaviour) by `node`.
pub struct RpcHandlers {
    ctx: Arc<HandlerContext>,
}

impl RpcHandlers {
    /// Wraps a [`HandlerContext`] as an [`RpcIngress`] implementor.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

fn params_error(e: serde_json::Error) -> RpcIngressError {
    RpcIngressError::new(ErrorKind::Validation, format!("malformed params: {e}"))
}

fn result_error(e: serde_json::Error) -> RpcIngressError {
    RpcIngressError::new(ErrorKind::Upstream, format!("failed to encode reply: {e}"))
}

#[async_trait]
impl RpcIngress for RpcHandlers {
    async fn dispatch(
        &self,
        verb: &str,
        params: serde_json::Value,
        caller: Contact,
    ) -> Result<serde_json::Value, RpcIngressError> {
        let start = Instant::now();
        let result = self.dispatch_verb(verb, params, caller).await;
        shardnet_telemetry::rpc_metrics().observe_request_duration(verb, start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => shardnet_telemetry::rpc_metrics().inc_requests_total(verb, "ok"),
            Err(e) => {
                shardnet_telemetry::rpc_metrics().inc_requests_total(verb, e.kind().as_label());
                shardnet_telemetry::error_metrics().inc_error(e.kind().as_label(), verb);
            }
        }
        result
    }
}

impl RpcHandlers {
    async fn dispatch_verb(
        &self,
        verb: &str,
        params: serde_json::Value,
        caller: Contact,
    ) -> Result<serde_json::Value, RpcIngressError> {
        match verb {
            "OFFER" => {
                let params: handlers::offer::OfferParams =
                    serde_json::from_value(params).map_err(params_error)?;
                let result = handlers::offer::handle(&self.ctx, caller, params)
                    .await
                    .map_err(to_ingress_error)?;
                serde_json::to_value(result).map_err(result_error)
            }
            "CLAIM" => {
                let params: handlers::claim::ClaimParams =
                    serde_json::from_value(params).map_err(params_error)?;
                let result = handlers::claim::handle(&self.ctx, caller, params)
                    .await
                    .map_err(to_ingress_error)?;
                serde_json::to_value(result).map_err(result_error)
            }
            "CONSIGN" => {
                let params: handlers::consign::ConsignParams =
                    serde_json::from_value(params).map_err(params_error)?;
                let result = handlers::consign::handle(&self.ctx, caller, params)
                    .await
                    .map_err(to_ingress_error)?;
                serde_json::to_value(result).map_err(result_error)
            }
            "RETRIEVE" => {
                let params: handlers::retrieve::RetrieveParams =
                    serde_json::from_value(params).map_err(params_error)?;
                let result = handlers::retrieve::handle(&self.ctx, caller, params)
                    .await
                    .map_err(to_ingress_error)?;
                serde_json::to_value(result).map_err(result_error)
            }
            "MIRROR" => {
                let params: handlers::mirror::MirrorParams =
                    serde_json::from_value(params).map_err(params_error)?;
                handlers::mirror::handle(&self.ctx, caller, params)
                    .await
                    .map_err(to_ingress_error)
            }
            "AUDIT" => {
                let params: handlers::audit::AuditParams =
                    serde_json::from_value(params).map_err(params_error)?;
                let result = handlers::audit::handle(&self.ctx, caller, params)
                    .await
                    .map_err(to_ingress_error)?;
                serde_json::to_value(result).map_err(result_error)
            }
            "RENEW" => {
                let params: handlers::renew::RenewParams =
                    serde_json::from_value(params).map_err(params_error)?;
                let result = handlers::renew::handle(&self.ctx, caller, params)
                    .await
                    .map_err(to_ingress_error)?;
                serde_json::to_value(result).map_err(result_error)
            }
            "PROBE" => {
                let result = handlers::probe::handle(&self.ctx, caller)
                    .await
                    .map_err(to_ingress_error)?;
                serde_json::to_value(result).map_err(result_error)
            }
            other => Err(RpcIngressError::new(
                ErrorKind::Validation,
                format!("unknown RPC verb: {other}"),
            )),
        }
    }
}

fn to_ingress_error(e: crate::error::RpcError) -> RpcIngressError {
    RpcIngressError::new(e.kind(), e.to_string())
}
