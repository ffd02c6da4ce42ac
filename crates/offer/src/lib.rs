// Path: crates/offer/src/lib.rs
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

//! The renter-side OfferStream auction: a
//! per-descriptor actor admitting farmer offers in FIFO order, bounded by
//! `maxOffers` and a farmer blacklist, exposing a lazy accepted-offer
//! sequence to the renter.

/// The actor, its producer/consumer handles, and the admitted-offer type.
pub mod stream;

pub use stream::{open, AdmittedOffer, OfferConsumer, OfferStream, Resolver, Verifier};
