// Path: crates/api/src/wallet.rs
//! The `WalletIntegration` external collaborator: mints a farmer's
//! `payment_destination` for a CLAIM, kept
//! as an interface-only seam so the RPC handler never hardcodes a wallet
//! scheme or a placeholder value.

use shardnet_types::contact::Identity;
use thiserror::Error;

/// Errors minting a payment destination.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The wallet backend could not produce a destination for this farmer.
    #[error("wallet integration failed: {0}")]
    MintFailed(String),
}

impl crate::HasErrorKind for WalletError {
    fn kind(&self) -> crate::ErrorKind {
        crate::ErrorKind::Upstream
    }
}

/// Mints an opaque payment-destination string for a farmer accepting a CLAIM.
///
/// This is deliberately a narrow trait: wallet integration is an external
/// collaborator out of scope for the
/// protocol state machine itself, so the `rpc` crate depends only on this
/// interface, never on a concrete payment backend.
pub trait WalletIntegration: Send + Sync {
    /// Returns the opaque wallet address the farmer should be paid to for
    /// fulfilling a contract with the named farmer identity.
    fn mint_payment_destination(&self, farmer_id: &Identity) -> Result<String, WalletError>;
}
