//! Hand-off of validated gossip payloads for later rebroadcast.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lngraph_core::{EdgeKey, GossipKind, NodeId, ShortChannelId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What a broadcast payload describes. A newer payload for the same tag
/// supersedes an older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BroadcastTag {
    Channel(ShortChannelId),
    Update(EdgeKey),
    Node(NodeId),
}

/// Receives validated gossip payloads. The sink decides how and when they
/// are relayed to other peers.
pub trait BroadcastSink: Send + Sync {
    fn store_for_rebroadcast(
        &self,
        kind: GossipKind,
        tag: BroadcastTag,
        timestamp: u32,
        payload: Bytes,
    );

    /// Stop relaying a payload, e.g. because its channel was pruned.
    fn forget(&self, kind: GossipKind, tag: BroadcastTag);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl BroadcastSink for NullSink {
    fn store_for_rebroadcast(&self, _: GossipKind, _: BroadcastTag, _: u32, _: Bytes) {}

    fn forget(&self, _: GossipKind, _: BroadcastTag) {}
}

/// A payload queued for rebroadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEntry {
    /// Position in the broadcast order; refreshed whenever the entry is superseded.
    pub index: u64,
    pub kind: GossipKind,
    pub tag: BroadcastTag,
    pub timestamp: u32,
    pub payload: Bytes,
}

/// In-memory broadcast queue keeping the newest payload per (kind, tag).
///
/// Every accepted payload gets a fresh, monotonically increasing index so a
/// rebroadcaster can sweep with [`BroadcastStore::next_after`].
pub struct BroadcastStore {
    entries: DashMap<(GossipKind, BroadcastTag), BroadcastEntry>,
    /// Broadcast order: index to the key currently holding it. Never held
    /// while acquiring an `entries` shard.
    order: Mutex<BTreeMap<u64, (GossipKind, BroadcastTag)>>,
    next_index: AtomicU64,
}

impl BroadcastStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(BTreeMap::new()),
            next_index: AtomicU64::new(1),
        }
    }

    /// Current entry for a (kind, tag) pair.
    pub fn get(&self, kind: GossipKind, tag: &BroadcastTag) -> Option<BroadcastEntry> {
        self.entries.get(&(kind, *tag)).map(|e| e.value().clone())
    }

    /// The entry with the smallest index strictly greater than `index`.
    /// Start a sweep with `0`.
    pub fn next_after(&self, index: u64) -> Option<BroadcastEntry> {
        let mut cursor = index;
        loop {
            let (next, key) = self
                .order
                .lock()
                .range((Bound::Excluded(cursor), Bound::Unbounded))
                .next()
                .map(|(i, key)| (*i, *key))?;
            // Superseded or removed since the order lock was released.
            match self.entries.get(&key) {
                Some(entry) if entry.index == next => return Some(entry.value().clone()),
                _ => cursor = next,
            }
        }
    }

    /// Drop an entry, e.g. after its channel was pruned.
    pub fn remove(&self, kind: GossipKind, tag: &BroadcastTag) -> Option<BroadcastEntry> {
        match self.entries.entry((kind, *tag)) {
            Entry::Occupied(occupied) => {
                let entry = occupied.remove();
                self.order.lock().remove(&entry.index);
                Some(entry)
            }
            Entry::Vacant(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn allocate_index(&self) -> u64 {
        self.next_index.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for BroadcastStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastSink for BroadcastStore {
    fn store_for_rebroadcast(
        &self,
        kind: GossipKind,
        tag: BroadcastTag,
        timestamp: u32,
        payload: Bytes,
    ) {
        match self.entries.entry((kind, tag)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().timestamp >= timestamp {
                    tracing::trace!(%kind, ?tag, timestamp, "not superseding newer broadcast");
                    return;
                }
                let index = self.allocate_index();
                let mut order = self.order.lock();
                order.remove(&occupied.get().index);
                order.insert(index, (kind, tag));
                drop(order);
                occupied.insert(BroadcastEntry {
                    index,
                    kind,
                    tag,
                    timestamp,
                    payload,
                });
            }
            Entry::Vacant(vacant) => {
                let index = self.allocate_index();
                self.order.lock().insert(index, (kind, tag));
                vacant.insert(BroadcastEntry {
                    index,
                    kind,
                    tag,
                    timestamp,
                    payload,
                });
            }
        }
    }

    fn forget(&self, kind: GossipKind, tag: BroadcastTag) {
        if self.remove(kind, &tag).is_some() {
            tracing::trace!(%kind, ?tag, "forgot broadcast");
        }
    }
}
