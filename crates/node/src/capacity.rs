// Path: crates/node/src/capacity.rs
//! The renter-side capacity cache:
//! farmer identity -> last-seen advertised capacity, populated from
//! `"0c" + topic_code` gossip announcements and compacted periodically.
//!
//! Producing announcements on a schedule is explicitly out of scope
//! (profile-level scheduling is an external collaborator's job); this
//! module only defines the wire shape and the single-shot
//! [`Node::announce_capacity`](crate::Node::announce_capacity) a farmer
//! operator (or an external scheduler) can call, plus the cache that
//! consumes them.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shardnet_types::contact::{Contact, Identity};

/// Prefix byte (as a two-hex-character string) for capacity-announcement
/// gossip topics.
pub const CAPACITY_TOPIC_PREFIX: &str = "0c";

/// The gossip payload a farmer publishes on a capacity topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityAnnouncement {
    pub farmer_id: Identity,
    pub contact: Contact,
    pub available: u64,
    pub allocated: u64,
}

/// A cached farmer's last-seen capacity, per the Data Model's
/// `{capacity: {available, allocated}, contact, last_seen_ts}` shape.
#[derive(Debug, Clone)]
pub struct CapacityEntry {
    pub available: u64,
    pub allocated: u64,
    pub contact: Contact,
    pub last_seen_ms: u64,
}

/// Buckets an available-capacity figure into one of 16 power-of-two-ish
/// classes, independently of [`shardnet_types::contract::Contract`]'s
/// private size bucketing but following the same scheme, so a capacity
/// topic and a descriptor topic for shards of comparable size land on
/// recognizably related topic codes.
pub fn capacity_topic_code(available_bytes: u64) -> String {
    let bucket = if available_bytes == 0 {
        0
    } else {
        (64 - available_bytes.leading_zeros()).min(u16::MAX as u32) as u16
    };
    format!("{:08x}", bucket as u32)
}

/// `"0c" + topic_code`, the gossipsub topic a capacity announcement for
/// `available_bytes` is published on.
pub fn capacity_topic(available_bytes: u64) -> String {
    format!("{CAPACITY_TOPIC_PREFIX}{}", capacity_topic_code(available_bytes))
}

/// Farmer identity -> last-seen capacity, updated from gossip and
/// compacted on a timer by [`crate::Node`].
#[derive(Default)]
pub struct CapacityCache {
    entries: DashMap<Identity, CapacityEntry>,
}

impl CapacityCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Records (or refreshes) a farmer's advertised capacity.
    pub fn record(&self, announcement: CapacityAnnouncement, now_ms: u64) {
        self.entries.insert(
            announcement.farmer_id,
            CapacityEntry {
                available: announcement.available,
                allocated: announcement.allocated,
                contact: announcement.contact,
                last_seen_ms: now_ms,
            },
        );
    }

    /// Looks up a farmer's last-seen capacity.
    pub fn get(&self, farmer_id: &Identity) -> Option<CapacityEntry> {
        self.entries.get(farmer_id).map(|e| e.value().clone())
    }

    /// Drops entries not refreshed within `max_age_ms` of `now_ms`, returning
    /// the number removed.
    pub fn compact(&self, now_ms: u64, max_age_ms: u64) -> usize {
        let stale: Vec<Identity> = self
            .entries
            .iter()
            .filter(|entry| now_ms.saturating_sub(entry.last_seen_ms) > max_age_ms)
            .map(|entry| *entry.key())
            .collect();
        for id in &stale {
            self.entries.remove(id);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardnet_types::contact::AddressInfo;

    fn sample_contact(id: u8) -> Contact {
        Contact {
            identity: Identity([id; 20]),
            info: AddressInfo {
                multiaddr: "/ip4/127.0.0.1/tcp/4001".to_string(),
                http_base_url: "http://127.0.0.1:8080".to_string(),
                xpub: vec![id; 33],
            },
        }
    }

    #[test]
    fn records_and_reads_back_capacity() {
        let cache = CapacityCache::new();
        let announcement = CapacityAnnouncement {
            farmer_id: Identity([1; 20]),
            contact: sample_contact(1),
            available: 1024,
            allocated: 512,
        };
        cache.record(announcement, 1_000);
        let entry = cache.get(&Identity([1; 20])).unwrap();
        assert_eq!(entry.available, 1024);
        assert_eq!(entry.allocated, 512);
    }

    #[test]
    fn compact_drops_stale_entries_only() {
        let cache = CapacityCache::new();
        cache.record(
            CapacityAnnouncement {
                farmer_id: Identity([1; 20]),
                contact: sample_contact(1),
                available: 1,
                allocated: 0,
            },
            0,
        );
        cache.record(
            CapacityAnnouncement {
                farmer_id: Identity([2; 20]),
                contact: sample_contact(2),
                available: 1,
                allocated: 0,
            },
            10_000,
        );
        let removed = cache.compact(10_000, 5_000);
        assert_eq!(removed, 1);
        assert!(cache.get(&Identity([1; 20])).is_none());
        assert!(cache.get(&Identity([2; 20])).is_some());
    }

    #[test]
    fn topic_code_is_stable_for_comparable_sizes() {
        let a = capacity_topic_code(1_000_000);
        let b = capacity_topic_code(1_000_001);
        assert_eq!(a, b);
    }
}
