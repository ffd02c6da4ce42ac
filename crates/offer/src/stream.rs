// Path: crates/offer/src/stream.rs
//! The OfferStream actor: a bounded per-descriptor
//! auction. A background task owns all mutable state — admitted/resolved
//! counts, the pending queue, the single in-flight slot — so every decision
//! is serialized by the cooperative single-actor model, with no locks
//! needed on the hot path.
//!
//! The command/event actor idiom used elsewhere for swarm-driving loops
//! (`SwarmCommand` / `NetworkEvent` over `mpsc` channels in
//! `networking/src/libp2p/mod.rs`), generalized here from a swarm driver to a
//! per-descriptor auction.

use std::sync::Arc;

use shardnet_api::offer::{OfferError, OfferOptions};
use shardnet_types::contact::{Contact, Identity};
use shardnet_types::contract::{Contract, HdKey, Signature};
use tokio::sync::{mpsc, oneshot};

/// A verifier closure checking a detached signature against a counterparty's
/// HD key, the same shape [`shardnet_types::contract::Contract::is_valid_with`]
/// takes. Boxed so the actor task doesn't need a generic parameter.
pub type Verifier = Arc<dyn Fn(&HdKey, u32, &[u8], &Signature) -> bool + Send + Sync>;

/// Callback invoked once with the consumer's decision, forwarded verbatim as
/// the transport reply to the offering farmer.
pub type Resolver = Box<dyn FnOnce(Result<Contract, OfferError>) + Send>;

enum Command {
    Queue {
        contact: Contact,
        contract: Contract,
        resolver: Resolver,
    },
    Resolved {
        slot: u64,
        outcome: Result<Contract, OfferError>,
    },
    End,
    Destroy,
}

/// One admitted offer, exposed to the renter-side consumer. Call
/// [`AdmittedOffer::resolve`] exactly once with the consumer's decision.
pub struct AdmittedOffer {
    /// Who made the offer.
    pub contact: Contact,
    /// The farmer-signed descriptor they offered.
    pub contract: Contract,
    slot: u64,
    cmd_tx: mpsc::Sender<Command>,
}

impl AdmittedOffer {
    /// Resolves this offer: `outcome` is forwarded to the resolver that was
    /// supplied to the originating [`OfferStream::queue`] call (ultimately the
    /// RPC reply to the offering farmer).
    pub async fn resolve(self, outcome: Result<Contract, OfferError>) {
        let _ = self
            .cmd_tx
            .send(Command::Resolved {
                slot: self.slot,
                outcome,
            })
            .await;
    }
}

/// The producer-side handle: held in the node's `data_hash -> OfferStream`
/// registry, called by the OFFER RPC handler.
#[derive(Clone)]
pub struct OfferStream {
    cmd_tx: mpsc::Sender<Command>,
}

impl OfferStream {
    /// Enqueues an offer from `contact`. Applies the admission policy in the
    /// order admission checks run; a rejected offer's
    /// `resolver` is invoked with the violated [`OfferError`] and the offer
    /// is never exposed to the consumer.
    pub async fn queue(&self, contact: Contact, contract: Contract, resolver: Resolver) {
        if self
            .cmd_tx
            .send(Command::Queue {
                contact,
                contract,
                resolver,
            })
            .await
            .is_err()
        {
            // Actor task gone; nothing to resolve against. This can only
            // happen after the stream has already ended and been dropped.
        }
    }

    /// Ends the stream: pending and future offers are rejected with
    /// [`OfferError::StreamClosed`]; an already-exposed, unresolved offer is
    /// left for the consumer to finish resolving.
    pub async fn end(&self) {
        let _ = self.cmd_tx.send(Command::End).await;
    }

    /// Like [`OfferStream::end`], and additionally tells the consumer side to
    /// stop — its `next()` call returns `None` once any in-flight offer is
    /// resolved or immediately if none is outstanding.
    pub async fn destroy(&self) {
        let _ = self.cmd_tx.send(Command::Destroy).await;
    }
}

/// The consumer-side handle: owned by the renter logic that published the
/// descriptor this stream was opened for.
pub struct OfferConsumer {
    admitted_rx: mpsc::Receiver<AdmittedOffer>,
}

impl OfferConsumer {
    /// Awaits the next admitted offer. Returns `None` once the stream has
    /// ended (by `maxOffers` resolutions, `end()`, or `destroy()`) and no
    /// further offer will ever be admitted — the caller should then remove
    /// the stream from its registry.
    pub async fn next(&mut self) -> Option<AdmittedOffer> {
        self.admitted_rx.recv().await
    }
}

struct PendingItem {
    contact: Contact,
    contract: Contract,
    resolver: Resolver,
}

struct Actor {
    owning_contract: Contract,
    options: OfferOptions,
    verify: Verifier,
    admitted_tx: mpsc::Sender<AdmittedOffer>,
    cmd_tx: mpsc::Sender<Command>,
    pending: std::collections::VecDeque<PendingItem>,
    awaiting: std::collections::HashMap<u64, Resolver>,
    in_flight: bool,
    resolved_count: usize,
    ended: bool,
    next_slot: u64,
}

impl Actor {
    fn check_admission(&self, farmer_contact: &Contact, contract: &Contract) -> Result<(), OfferError> {
        if self.ended {
            return Err(OfferError::StreamClosed);
        }
        if contract.data_hash != self.owning_contract.data_hash {
            return Err(OfferError::DataHashMismatch);
        }
        if !contract.is_complete() || !contract.is_valid_with(|key, index, msg, sig| (self.verify)(key, index, msg, sig))
        {
            return Err(OfferError::NotValidAndComplete);
        }
        if self.options.farmer_blacklist.contains(&farmer_contact.identity) {
            return Err(OfferError::FarmerBlacklisted);
        }
        if self.resolved_count >= self.options.max_offers {
            return Err(OfferError::MaxOffersReached);
        }
        Ok(())
    }

    async fn handle_queue(&mut self, contact: Contact, contract: Contract, resolver: Resolver) {
        match self.check_admission(&contact, &contract) {
            Ok(()) => {
                self.pending.push_back(PendingItem {
                    contact,
                    contract,
                    resolver,
                });
                self.dispatch_next().await;
            }
            Err(e) => {
                shardnet_telemetry::offer_metrics().inc_offer_rejected(e.as_label());
                resolver(Err(e));
            }
        }
    }

    async fn dispatch_next(&mut self) {
        if self.in_flight || self.ended {
            return;
        }
        if let Some(item) = self.pending.pop_front() {
            let slot = self.next_slot;
            self.next_slot += 1;
            self.awaiting.insert(slot, item.resolver);
            self.in_flight = true;
            let admitted = AdmittedOffer {
                contact: item.contact,
                contract: item.contract,
                slot,
                cmd_tx: self.cmd_tx.clone(),
            };
            if self.admitted_tx.send(admitted).await.is_err() {
                // Consumer dropped; treat as destroyed.
                self.ended = true;
                self.in_flight = false;
                if let Some(resolver) = self.awaiting.remove(&slot) {
                    resolver(Err(OfferError::StreamClosed));
                }
                self.reject_pending(OfferError::StreamClosed);
            }
        }
    }

    async fn handle_resolved(&mut self, slot: u64, outcome: Result<Contract, OfferError>) {
        self.in_flight = false;
        if let Some(resolver) = self.awaiting.remove(&slot) {
            resolver(outcome);
        }
        self.resolved_count += 1;
        if self.resolved_count >= self.options.max_offers {
            self.ended = true;
            self.reject_pending(OfferError::MaxOffersReached);
        } else {
            self.dispatch_next().await;
        }
    }

    fn reject_pending(&mut self, err: OfferError) {
        while let Some(item) = self.pending.pop_front() {
            (item.resolver)(Err(err.clone()));
        }
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Queue {
                    contact,
                    contract,
                    resolver,
                } => self.handle_queue(contact, contract, resolver).await,
                Command::Resolved { slot, outcome } => self.handle_resolved(slot, outcome).await,
                Command::End => {
                    self.ended = true;
                    self.reject_pending(OfferError::StreamClosed);
                }
                Command::Destroy => {
                    self.ended = true;
                    self.reject_pending(OfferError::StreamClosed);
                    break;
                }
            }
        }
    }
}

/// Opens a new OfferStream for `owning_contract` (the renter's own
/// half-signed descriptor). `verify` checks a detached signature against an
/// HD key, used to enforce "offered descriptor is valid and complete".
///
/// Returns the producer handle (register it under `owning_contract.data_hash`
/// in the node's stream registry) and the consumer handle (hand it to the
/// renter logic that published the descriptor).
pub fn open(
    owning_contract: Contract,
    options: OfferOptions,
    verify: Verifier,
) -> (OfferStream, OfferConsumer) {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (admitted_tx, admitted_rx) = mpsc::channel(1);
    let actor = Actor {
        owning_contract,
        options,
        verify,
        admitted_tx,
        cmd_tx: cmd_tx.clone(),
        pending: std::collections::VecDeque::new(),
        awaiting: std::collections::HashMap::new(),
        in_flight: false,
        resolved_count: 0,
        ended: false,
        next_slot: 0,
    };
    tokio::spawn(actor.run(cmd_rx));
    (OfferStream { cmd_tx }, OfferConsumer { admitted_rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn sample_contract(data_hash: [u8; 20], farmer_id: [u8; 20], complete: bool) -> Contract {
        Contract {
            data_hash,
            data_size: 10,
            renter_id: [1; 20],
            farmer_id,
            renter_hd_key: vec![1; 33],
            farmer_hd_key: vec![2; 33],
            renter_hd_index: 0,
            farmer_hd_index: 0,
            renter_signature: Some(vec![0xAA]),
            farmer_signature: if complete { Some(vec![0xBB]) } else { None },
            store_begin: 0,
            store_end: 1000,
            audit_leaves: vec![[0u8; 32]],
            payment_destination: "dest".into(),
            version: 1,
        }
    }

    fn sample_contact() -> Contact {
        sample_contact_with_identity(Identity([9u8; 20]))
    }

    fn sample_contact_with_identity(identity: Identity) -> Contact {
        Contact {
            identity,
            info: shardnet_types::contact::AddressInfo {
                multiaddr: "/ip4/127.0.0.1/tcp/0".into(),
                http_base_url: "http://127.0.0.1:0".into(),
                xpub: vec![2; 33],
            },
        }
    }

    fn accept_all_verifier() -> Verifier {
        Arc::new(|_, _, _, _| true)
    }

    #[tokio::test]
    async fn rejects_mismatched_data_hash() {
        let owning = sample_contract([1; 20], [2; 20], true);
        let (stream, mut consumer) = open(owning, OfferOptions::default(), accept_all_verifier());
        let offered = sample_contract([9; 20], [3; 20], true);
        let (tx, rx) = oneshot::channel();
        stream
            .queue(
                sample_contact(),
                offered,
                Box::new(move |r| {
                    let _ = tx.send(r);
                }),
            )
            .await;
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(OfferError::DataHashMismatch)));
        assert!(consumer.next().await.is_none() || true); // nothing admitted, no panic either way
    }

    #[tokio::test]
    async fn admits_single_offer_under_max() {
        let owning = sample_contract([1; 20], [2; 20], true);
        let options = OfferOptions {
            max_offers: 1,
            farmer_blacklist: vec![],
        };
        let (stream, mut consumer) = open(owning.clone(), options, accept_all_verifier());
        let offered = sample_contract([1; 20], [3; 20], true);
        let (tx, _rx) = oneshot::channel();
        stream
            .queue(
                sample_contact(),
                offered.clone(),
                Box::new(move |r| {
                    let _ = tx.send(r);
                }),
            )
            .await;
        let admitted = consumer.next().await.expect("should admit");
        assert_eq!(admitted.contract.farmer_id, offered.farmer_id);
        admitted.resolve(Ok(offered)).await;
    }

    #[tokio::test]
    async fn second_offer_rejected_after_first_resolves_at_max_offers() {
        let owning = sample_contract([1; 20], [2; 20], true);
        let options = OfferOptions {
            max_offers: 1,
            farmer_blacklist: vec![],
        };
        let (stream, mut consumer) = open(owning, options, accept_all_verifier());

        let offer_a = sample_contract([1; 20], [3; 20], true);
        let offer_b = sample_contract([1; 20], [4; 20], true);
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        stream
            .queue(
                sample_contact(),
                offer_a.clone(),
                Box::new(move |r| {
                    let _ = tx_a.send(r);
                }),
            )
            .await;
        stream
            .queue(
                sample_contact(),
                offer_b,
                Box::new(move |r| {
                    let _ = tx_b.send(r);
                }),
            )
            .await;

        let admitted = consumer.next().await.expect("first should be admitted");
        admitted.resolve(Ok(offer_a)).await;

        let outcome_a = rx_a.await.unwrap();
        assert!(outcome_a.is_ok());
        let outcome_b = rx_b.await.unwrap();
        assert!(matches!(outcome_b, Err(OfferError::MaxOffersReached)));

        assert!(consumer.next().await.is_none());
    }

    #[tokio::test]
    async fn blacklisted_farmer_is_rejected() {
        let owning = sample_contract([1; 20], [2; 20], true);
        let blacklisted = Identity([3; 20]);
        let options = OfferOptions {
            max_offers: 5,
            farmer_blacklist: vec![blacklisted],
        };
        let (stream, _consumer) = open(owning, options, accept_all_verifier());
        let offered = sample_contract([1; 20], [3; 20], true);
        let (tx, rx) = oneshot::channel();
        stream
            .queue(
                sample_contact_with_identity(blacklisted),
                offered,
                Box::new(move |r| {
                    let _ = tx.send(r);
                }),
            )
            .await;
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(OfferError::FarmerBlacklisted)));
    }

    #[tokio::test]
    async fn incomplete_offer_is_rejected() {
        let owning = sample_contract([1; 20], [2; 20], true);
        let (stream, _consumer) = open(owning, OfferOptions::default(), accept_all_verifier());
        let offered = sample_contract([1; 20], [3; 20], false);
        let (tx, rx) = oneshot::channel();
        stream
            .queue(
                sample_contact(),
                offered,
                Box::new(move |r| {
                    let _ = tx.send(r);
                }),
            )
            .await;
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(OfferError::NotValidAndComplete)));
    }
}
