// Path: crates/api/src/offer.rs
//! Shared types for the OfferStream auction subsystem: the admission-policy
//! errors and construction options. The actor implementation itself lives in
//! the `offer` crate; these types are shared with `rpc` and `networking`
//! without either depending on the actor's internals.

use shardnet_types::contact::Identity;
use thiserror::Error;

/// Errors an OfferStream's admission policy or lifecycle can raise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OfferError {
    /// The offered descriptor's `data_hash` doesn't match the owning contract.
    #[error("offered descriptor does not match the published data_hash")]
    DataHashMismatch,
    /// The offered descriptor is not valid-and-complete on the farmer side.
    #[error("offered descriptor is not valid and complete")]
    NotValidAndComplete,
    /// The offering farmer's identity is blacklisted for this stream.
    #[error("farmer is blacklisted for this offer stream")]
    FarmerBlacklisted,
    /// `maxOffers` resolved offers have already been admitted.
    #[error("offer stream has reached its maximum number of offers")]
    MaxOffersReached,
    /// The stream has ended (consumer closed it or it was destroyed).
    #[error("Offers for descriptor are closed")]
    StreamClosed,
    /// No OfferStream is registered for the requested `data_hash`.
    #[error("Offers for descriptor are closed")]
    NoSuchStream,
}

impl crate::HasErrorKind for OfferError {
    fn kind(&self) -> crate::ErrorKind {
        match self {
            OfferError::DataHashMismatch | OfferError::NotValidAndComplete => {
                crate::ErrorKind::Validation
            }
            OfferError::FarmerBlacklisted
            | OfferError::MaxOffersReached
            | OfferError::StreamClosed
            | OfferError::NoSuchStream => crate::ErrorKind::Validation,
        }
    }
}

impl OfferError {
    /// Stable per-variant label for offer-rejection metrics, finer-grained
    /// than [`crate::HasErrorKind::kind`].
    pub fn as_label(&self) -> &'static str {
        match self {
            OfferError::DataHashMismatch => "data_hash_mismatch",
            OfferError::NotValidAndComplete => "not_valid_and_complete",
            OfferError::FarmerBlacklisted => "farmer_blacklisted",
            OfferError::MaxOffersReached => "max_offers_reached",
            OfferError::StreamClosed => "stream_closed",
            OfferError::NoSuchStream => "no_such_stream",
        }
    }
}

/// Construction options for a renter-side OfferStream.
#[derive(Debug, Clone)]
pub struct OfferOptions {
    /// Maximum number of offers admitted before the stream closes itself.
    pub max_offers: usize,
    /// Farmer identities never admitted, regardless of descriptor validity.
    pub farmer_blacklist: Vec<Identity>,
}

impl Default for OfferOptions {
    fn default() -> Self {
        Self {
            max_offers: 1,
            farmer_blacklist: Vec::new(),
        }
    }
}
