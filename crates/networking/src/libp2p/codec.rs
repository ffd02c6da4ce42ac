// Path: crates/networking/src/libp2p/codec.rs
//! The wire envelope and `request_response::Codec` for the eight overlay RPC
//! verbs, carried over protocol `/shardnet/rpc/1`.
//!
//! A length-prefixed UVI varint framing over a SCALE payload, generalized
//! from `SyncRequest`/`SyncResponse` (block-sync messages) to
//! `RpcWireRequest`/`RpcWireResponse` (one overlay RPC verb call).

use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use libp2p::request_response::Codec;
use parity_scale_codec::{Decode, Encode};
use shardnet_types::codec;
use shardnet_types::contact::Contact;

/// One overlay RPC request: a verb name, its JSON-encoded params, and the
/// caller's contact envelope. Params stay JSON (rather than a per-verb SCALE
/// type) so the same [`shardnet_api::rpc_ingress::RpcIngress::dispatch`]
/// signature serves both this transport and the HTTP gateway's ingress route.
#[derive(Debug, Clone, Encode, Decode)]
pub struct RpcWireRequest {
    /// One of `OFFER`, `CLAIM`, `CONSIGN`, `RETRIEVE`, `MIRROR`, `AUDIT`,
    /// `RENEW`, `PROBE`.
    pub verb: String,
    /// UTF-8 JSON-encoded params, opaque to the transport layer.
    pub params_json: Vec<u8>,
    /// Who is calling.
    pub caller: Contact,
}

/// The machine-readable error classification echoed alongside a failure's
/// message, mirroring [`shardnet_types::error::ErrorKind`] without this
/// crate depending on its variants directly.
#[derive(Debug, Clone, Encode, Decode)]
pub struct RpcErrorBody {
    /// Stable label, e.g. `"validation"`, `"not_found"`.
    pub kind_label: String,
    /// Human-readable message, surfaced to the caller verbatim.
    pub message: String,
}

/// The reply to an [`RpcWireRequest`]: the same verb name, and either the
/// UTF-8 JSON-encoded result or a structured error.
#[derive(Debug, Clone, Encode, Decode)]
pub struct RpcWireResponse {
    /// Echoes the request's verb.
    pub verb: String,
    /// `Ok` with JSON-encoded result bytes, or `Err` with the failure.
    pub result: Result<Vec<u8>, RpcErrorBody>,
}

/// The SCALE-over-length-prefixed-varint codec for `/shardnet/rpc/1`.
#[derive(Debug, Clone, Default)]
pub struct RpcCodec;

async fn read_length_prefixed<T: AsyncRead + Unpin + Send>(
    io: &mut T,
    max_len: usize,
) -> std::io::Result<Vec<u8>> {
    let buf = [0u8; 10];
    let mut i = 0;
    let mut len: u64 = 0;
    let mut shift = 0;

    loop {
        if i >= buf.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "varint too long",
            ));
        }
        let mut b = [0u8; 1];
        io.read_exact(&mut b).await?;
        let byte = b[0];

        len |= ((byte & 0x7f) as u64) << shift;
        shift += 7;

        if (byte & 0x80) == 0 {
            break;
        }
        i += 1;
    }

    if len > max_len as u64 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "message too large",
        ));
    }

    let mut vec = vec![0u8; len as usize];
    io.read_exact(&mut vec).await?;
    Ok(vec)
}

async fn write_length_prefixed<T: AsyncWrite + Unpin + Send>(
    io: &mut T,
    data: Vec<u8>,
) -> std::io::Result<()> {
    let mut len = data.len() as u64;
    let mut encoded_len = [0u8; 10];
    let mut i = 0;

    loop {
        let mut byte = (len & 0x7f) as u8;
        len >>= 7;
        if len != 0 {
            byte |= 0x80;
        }
        encoded_len[i] = byte;
        i += 1;
        if len == 0 {
            break;
        }
    }

    io.write_all(&encoded_len[..i]).await?;
    io.write_all(&data).await?;
    Ok(())
}

#[async_trait]
impl Codec for RpcCodec {
    type Protocol = &'static str;
    type Request = RpcWireRequest;
    type Response = RpcWireResponse;

    async fn read_request<T: AsyncRead + Unpin + Send>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
    ) -> std::io::Result<Self::Request> {
        let vec = read_length_prefixed(io, 16_000_000).await?;
        codec::from_bytes_canonical(&vec)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    async fn read_response<T: AsyncRead + Unpin + Send>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
    ) -> std::io::Result<Self::Response> {
        let vec = read_length_prefixed(io, 16_000_000).await?;
        codec::from_bytes_canonical(&vec)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    async fn write_request<T: AsyncWrite + Unpin + Send>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        req: Self::Request,
    ) -> std::io::Result<()> {
        let vec = codec::to_bytes_canonical(&req)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        write_length_prefixed(io, vec).await
    }

    async fn write_response<T: AsyncWrite + Unpin + Send>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        res: Self::Response,
    ) -> std::io::Result<()> {
        let vec = codec::to_bytes_canonical(&res)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        write_length_prefixed(io, vec).await
    }
}
