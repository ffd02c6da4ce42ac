// crates/types/src/contact.rs
//! The typed `Contact` envelope the overlay attaches to every RPC: an
//! identity plus dialable address info. The source represents this as a
//! 2-element `[identity_hex, address_info]` tuple; here it is a named record.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A node identity hash (20 bytes, the same width as [`crate::contract::DataHash`],
/// reused here for the identity-hash space).
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash,
)]
pub struct Identity(pub [u8; 20]);

impl Identity {
    /// Lowercase hex encoding, matching `identity_hex` in the overlay handshake.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a lowercase hex identity string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Identity(arr))
    }
}

/// Dialable address information for a peer, carrying the extended public key
/// ("xpub") that identifies it as a contract counterparty.
///
/// `xpub` is derived via a typed extension that address-info carries
/// (not a free-form key), so it is a field
/// here rather than something callers extract out of a generic key bag.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct AddressInfo {
    /// Multiaddr-style dial string for the overlay transport.
    pub multiaddr: String,
    /// Base URL of this peer's HTTP shard-transfer server, e.g. `https://host:port`.
    pub http_base_url: String,
    /// The peer's extended public key, used as the contract-store counterparty key.
    pub xpub: Vec<u8>,
}

/// The envelope carried with every overlay RPC: who is calling, and how to
/// reach them back.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Contact {
    /// The caller's node identity.
    pub identity: Identity,
    /// The caller's dialable address information.
    pub info: AddressInfo,
}

impl Contact {
    /// Convenience accessor mirroring the source's `contact.xpub`.
    pub fn xpub(&self) -> &[u8] {
        &self.info.xpub
    }
}
